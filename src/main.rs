//! Chess lobby server.
//!
//! Usage:
//!
//! ```text
//! chess-lobby [--bind ADDR] [--sweep-ms N] [--clock-minutes N]
//!             [--increment-secs N] [--unchecked] [--debug]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::process::ExitCode;
use std::time::Duration;

use chess_lobby::lobby::DEFAULT_BIND;
use chess_lobby::{Error, Lobby, LobbyOptions, RelayMode, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    bind: String,
    sweep_ms: Option<u64>,
    clock_minutes: Option<u64>,
    increment_secs: Option<u64>,
    unchecked: bool,
    debug: bool,
}

impl Args {
    /// Parses command-line arguments.
    fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self {
            bind: DEFAULT_BIND.to_owned(),
            sweep_ms: None,
            clock_minutes: None,
            increment_secs: None,
            unchecked: false,
            debug: false,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => parsed.bind = value(&arg, args.next())?,
                "--sweep-ms" => parsed.sweep_ms = Some(number(&arg, args.next())?),
                "--clock-minutes" => parsed.clock_minutes = Some(number(&arg, args.next())?),
                "--increment-secs" => parsed.increment_secs = Some(number(&arg, args.next())?),
                "--unchecked" => parsed.unchecked = true,
                "--debug" => parsed.debug = true,
                other => return Err(Error::config(format!("Unknown argument: {other}"))),
            }
        }

        Ok(parsed)
    }

    /// Lobby options implied by the flags.
    fn options(&self) -> Result<LobbyOptions> {
        let mut options = LobbyOptions::new();

        if let Some(ms) = self.sweep_ms {
            options = options.with_sweep_interval(Duration::from_millis(ms));
        }
        if let Some(minutes) = self.clock_minutes {
            if minutes.checked_mul(60).is_none() {
                return Err(Error::config("--clock-minutes out of range"));
            }
            options = options.with_clock_minutes(minutes);
        }
        if let Some(secs) = self.increment_secs {
            options = options.with_increment(Duration::from_secs(secs));
        }
        if self.unchecked {
            options = options.with_relay_mode(RelayMode::Unchecked);
        }

        options.validate()?;
        Ok(options)
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String> {
    next.ok_or_else(|| Error::config(format!("{flag} expects a value")))
}

fn number(flag: &str, next: Option<String>) -> Result<u64> {
    let raw = value(flag, next)?;
    raw.parse()
        .map_err(|_| Error::config(format!("{flag} expects a number, got {raw:?}")))
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "chess_lobby=debug"
    } else {
        "chess_lobby=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let lobby = Lobby::builder()
        .bind(args.bind.clone())
        .options(args.options()?)
        .build()?
        .start()
        .await?;

    info!(url = %lobby.ws_url(), "Server started, waiting for Ctrl+C");

    tokio::signal::ctrl_c().await?;
    lobby.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    init_logging(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server startup error");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

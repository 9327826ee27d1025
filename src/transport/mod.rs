//! WebSocket transport layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐                             ┌──────────────────────┐
//! │  Client      │         WebSocket           │  Listener            │
//! │  (browser)   │◄───────────────────────────►│  → admission         │
//! │              │   /ws?userId=<identity>     │  → WsConnection      │
//! └──────────────┘                             │  → WaitingPool       │
//!                                              └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection seam and WebSocket writer loop |
//! | `listener` | Accept loop and upgrade-time admission |

// ============================================================================
// Submodules
// ============================================================================

/// Connection seam and WebSocket implementation.
pub mod connection;

/// Accept loop and admission.
pub mod listener;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionHandle, WsConnection};
pub use listener::{IDENTITY_PARAM, Listener, WS_PATH, identity_from_uri};

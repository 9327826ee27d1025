//! Paired session: announcement, bidirectional relay and teardown.
//!
//! # Lifecycle
//!
//! 1. Both members receive `MATCH_FOUND`.
//! 2. Two relay directions run concurrently, one per sender.
//! 3. A direction ends when its sender's connection stops yielding frames.
//! 4. Once both directions ended, both connections are closed and both
//!    participants return to idle.
//!
//! The first terminal event wins. Later ones (the second direction noticing
//! the closed connection, a late timeout) produce no extra notice.
//!
//! # Relay Modes
//!
//! | Mode | `MOVE` | Other frames |
//! |------|--------|--------------|
//! | [`RelayMode::Validated`] | Applied to the game first; rejected moves are dropped | Relayed verbatim |
//! | [`RelayMode::Unchecked`] | Relayed verbatim, also applied to the game for logging | Relayed verbatim |

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::identifiers::RoomId;
use crate::matchmaking::{Pairing, Participant};
use crate::protocol::{Envelope, MOVE_KIND, MoveRequest, Notice};
use crate::rules::RulesEngine;

use super::{ClockConfig, EndReason, GameSession, Phase, Role};

// ============================================================================
// RelayMode
// ============================================================================

/// How `MOVE` frames are treated by the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RelayMode {
    /// Moves are validated; the game can end the session.
    #[default]
    Validated,
    /// Everything is relayed; the game is bookkeeping only.
    Unchecked,
}

// ============================================================================
// Route
// ============================================================================

/// Decision for one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Relay to the opponent.
    Forward,
    /// Relay to the opponent, then end the game.
    ForwardThenEnd(EndReason),
    /// Relay nothing.
    Drop,
}

// ============================================================================
// Session
// ============================================================================

/// Two bound participants and their game.
pub struct Session<R: RulesEngine> {
    room_id: RoomId,
    members: [Participant; 2],
    game: Mutex<GameSession<R>>,
    outcome: OnceLock<EndReason>,
    mode: RelayMode,
}

impl<R: RulesEngine> Session<R> {
    /// Creates a session with `first` as first mover.
    ///
    /// The clocks start now.
    #[must_use]
    pub fn new(
        room_id: RoomId,
        first: Participant,
        second: Participant,
        rules: Arc<R>,
        clock: ClockConfig,
        mode: RelayMode,
    ) -> Self {
        Self {
            room_id,
            members: [first, second],
            game: Mutex::new(GameSession::new(rules, clock, Instant::now())),
            outcome: OnceLock::new(),
            mode,
        }
    }

    /// Creates a session from a sweep pairing.
    #[must_use]
    pub fn from_pairing(
        pairing: Pairing,
        rules: Arc<R>,
        clock: ClockConfig,
        mode: RelayMode,
    ) -> Self {
        let (room_id, first, second) = pairing.into_parts();
        Self::new(room_id, first, second, rules, clock, mode)
    }

    /// Returns the room.
    #[inline]
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns the participant playing `role`.
    #[inline]
    #[must_use]
    pub fn participant(&self, role: Role) -> &Participant {
        &self.members[role.index()]
    }

    /// Returns how the session ended, if it has.
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> Option<EndReason> {
        self.outcome.get().copied()
    }

    /// Returns the game phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.game.lock().phase()
    }

    /// Closes both connections, which ends both relay directions.
    pub fn abort(&self) {
        for member in &self.members {
            member.close();
        }
    }

    /// Runs the session to completion and returns how it ended.
    pub async fn run(&self) -> EndReason {
        info!(
            room = %self.room_id,
            white = %self.participant(Role::FirstMover).id(),
            black = %self.participant(Role::SecondMover).id(),
            mode = ?self.mode,
            "Match started"
        );

        self.announce().await;

        tokio::join!(
            self.relay(Role::FirstMover),
            self.relay(Role::SecondMover)
        );

        for member in &self.members {
            member.close();
            member.release();
        }

        let reason = self.outcome().unwrap_or(EndReason::OpponentLeft);
        info!(room = %self.room_id, %reason, "Match ended, participants released");
        reason
    }

    /// Sends `MATCH_FOUND` to both members.
    async fn announce(&self) {
        for role in Role::BOTH {
            let member = self.participant(role);
            let notice = Notice::MatchFound {
                color: role,
                opponent_id: self.participant(role.opponent()).id().clone(),
                room_id: self.room_id.clone(),
            };

            if let Err(e) = member.notify(&notice).await {
                warn!(room = %self.room_id, participant = %member.id(), error = %e, "Failed to announce match");
            }
        }
    }

    /// Relays frames sent by `from` until its connection ends.
    async fn relay(&self, from: Role) {
        let sender = self.participant(from);
        let receiver = self.participant(from.opponent());

        loop {
            let envelope = match sender.connection().recv().await {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!(room = %self.room_id, participant = %sender.id(), error = %e, "Participant disconnected");
                    self.depart(from).await;
                    return;
                }
            };

            match self.route(from, &envelope) {
                Route::Forward => self.forward(receiver, envelope).await,

                Route::ForwardThenEnd(reason) => {
                    self.forward(receiver, envelope).await;
                    self.conclude(reason).await;
                }

                Route::Drop => {}
            }
        }
    }

    /// Decides what to do with a frame sent by `from`.
    fn route(&self, from: Role, envelope: &Envelope) -> Route {
        let now = Instant::now();
        let mut game = self.game.lock();

        if !envelope.is_kind(MOVE_KIND) {
            if self.mode == RelayMode::Unchecked {
                return Route::Forward;
            }
            return match game.check_flag_at(now) {
                Phase::Ended(reason) if self.outcome.get().is_none() => {
                    Route::ForwardThenEnd(reason)
                }
                _ => Route::Forward,
            };
        }

        let request = match MoveRequest::from_envelope(envelope) {
            Ok(request) => request,
            Err(e) => {
                debug!(room = %self.room_id, role = %from, error = %e, "Malformed move");
                return match self.mode {
                    RelayMode::Validated => Route::Drop,
                    RelayMode::Unchecked => Route::Forward,
                };
            }
        };

        match (game.handle_move_at(from, request.notation(), now), self.mode) {
            (Ok(Phase::Active { turn }), _) => {
                trace!(room = %self.room_id, role = %from, notation = request.notation(), next = %turn, "Move accepted");
                Route::Forward
            }

            (Ok(Phase::Ended(reason)), RelayMode::Validated) => Route::ForwardThenEnd(reason),

            (Ok(Phase::Ended(reason)), RelayMode::Unchecked) => {
                info!(room = %self.room_id, %reason, "Game decided, relay continues");
                Route::Forward
            }

            (Err(rejection), RelayMode::Validated) => {
                debug!(room = %self.room_id, role = %from, error = %rejection, "Move rejected");
                Route::Drop
            }

            (Err(rejection), RelayMode::Unchecked) => {
                debug!(room = %self.room_id, role = %from, error = %rejection, "Unverified move relayed");
                Route::Forward
            }
        }
    }

    /// Relays one frame.
    async fn forward(&self, receiver: &Participant, envelope: Envelope) {
        if let Err(e) = receiver.send(envelope).await {
            warn!(room = %self.room_id, participant = %receiver.id(), error = %e, "Error forwarding");
        }
    }

    /// Records the first terminal event and returns it.
    ///
    /// In validated mode a game already decided under the lock wins over
    /// `reason`. Returns `None` if an earlier call recorded the outcome.
    fn finish(&self, reason: EndReason) -> Option<EndReason> {
        let mut game = self.game.lock();
        let reason = match game.phase() {
            Phase::Ended(decided) if self.mode == RelayMode::Validated => decided,
            _ => reason,
        };

        self.outcome.set(reason).ok()?;
        game.end(reason);
        Some(reason)
    }

    /// Ends the session because `departed` went away.
    async fn depart(&self, departed: Role) {
        match self.finish(EndReason::OpponentLeft) {
            None => return,
            Some(EndReason::OpponentLeft) => {}
            Some(decided) => {
                self.announce_result(decided).await;
                return;
            }
        }

        let survivor = self.participant(departed.opponent());
        info!(
            room = %self.room_id,
            departed = %self.participant(departed).id(),
            survivor = %survivor.id(),
            "Opponent left"
        );

        self.participant(departed).close();

        if let Err(e) = survivor.notify(&Notice::OpponentLeft).await {
            debug!(participant = %survivor.id(), error = %e, "Failed to notify survivor");
        }
        survivor.close();
    }

    /// Ends a decided game.
    async fn conclude(&self, reason: EndReason) {
        if let Some(reason) = self.finish(reason) {
            self.announce_result(reason).await;
        }
    }

    /// Sends `GAME_OVER` to both, then closes both.
    async fn announce_result(&self, reason: EndReason) {
        let notice = {
            let game = self.game.lock();
            let clocks = game.clocks();
            Notice::GameOver {
                reason,
                white_ms: clocks.remaining_ms(Role::FirstMover),
                black_ms: clocks.remaining_ms(Role::SecondMover),
            }
        };

        info!(room = %self.room_id, %reason, "Game over");

        for member in &self.members {
            if let Err(e) = member.notify(&notice).await {
                debug!(participant = %member.id(), error = %e, "Failed to send game over");
            }
        }

        self.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use crate::matchmaking::Membership;
    use crate::rules::ChessRules;
    use crate::test_support::MockConnection;

    struct Fixture {
        session: Arc<Session<ChessRules>>,
        white: Arc<MockConnection>,
        black: Arc<MockConnection>,
        task: tokio::task::JoinHandle<EndReason>,
    }

    fn start(mode: RelayMode) -> Fixture {
        start_with_clock(mode, ClockConfig::default())
    }

    fn start_with_clock(mode: RelayMode, clock: ClockConfig) -> Fixture {
        let (alice, white) = MockConnection::participant("alice");
        let (bob, black) = MockConnection::participant("bob");
        let pairing = Pairing::bind(alice, bob);

        let session = Arc::new(Session::from_pairing(
            pairing,
            Arc::new(ChessRules::new()),
            clock,
            mode,
        ));

        let task = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });

        Fixture {
            session,
            white,
            black,
            task,
        }
    }

    fn kinds(frames: &[Envelope]) -> Vec<&str> {
        frames.iter().map(|f| f.kind().unwrap_or("?")).collect()
    }

    #[tokio::test]
    async fn test_match_found_is_complementary() {
        let fixture = start(RelayMode::Validated);

        let white = fixture.white.wait_sent(1).await;
        let black = fixture.black.wait_sent(1).await;

        assert_eq!(white[0].kind(), Some("MATCH_FOUND"));
        assert_eq!(white[0].get("color"), Some(&json!("w")));
        assert_eq!(white[0].get("opponent_id"), Some(&json!("bob")));
        assert_eq!(black[0].get("color"), Some(&json!("b")));
        assert_eq!(black[0].get("opponent_id"), Some(&json!("alice")));
        assert_eq!(white[0].get("room_id"), black[0].get("room_id"));
        assert_eq!(
            white[0].get("room_id"),
            Some(&json!(fixture.session.room_id().as_str()))
        );

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_opponent_left_sent_exactly_once() {
        let fixture = start(RelayMode::Validated);
        fixture.white.wait_sent(1).await;
        fixture.black.wait_sent(1).await;

        fixture.black.fail_read();

        let reason = fixture.task.await.expect("session task");
        assert_eq!(reason, EndReason::OpponentLeft);

        let white = fixture.white.sent();
        assert_eq!(kinds(&white), ["MATCH_FOUND", "OPPONENT_LEFT"]);
        assert_eq!(kinds(&fixture.black.sent()), ["MATCH_FOUND"]);
        assert_eq!(fixture.session.phase(), Phase::Ended(EndReason::OpponentLeft));
        assert!(fixture.white.is_closed());

        for role in Role::BOTH {
            assert_eq!(fixture.session.participant(role).membership(), Membership::Idle);
        }
    }

    #[tokio::test]
    async fn test_second_end_is_silent() {
        let fixture = start(RelayMode::Validated);
        fixture.white.wait_sent(1).await;
        fixture.white.fail_read();
        fixture.task.await.expect("session task");

        let before = (fixture.white.sent().len(), fixture.black.sent().len());

        fixture.session.depart(Role::FirstMover).await;
        fixture.session.depart(Role::SecondMover).await;
        fixture.session.conclude(EndReason::Checkmate).await;

        assert_eq!((fixture.white.sent().len(), fixture.black.sent().len()), before);
        assert_eq!(fixture.session.outcome(), Some(EndReason::OpponentLeft));
    }

    #[tokio::test]
    async fn test_chat_relayed_verbatim() {
        let fixture = start(RelayMode::Validated);
        fixture.black.wait_sent(1).await;

        let chat = json!({"type": "CHAT", "text": "gl hf", "user": "alice"});
        fixture.white.push(chat.clone());

        let black = fixture.black.wait_sent(2).await;
        assert_eq!(serde_json::to_value(&black[1]).expect("json"), chat);

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_legal_move_relayed_verbatim() {
        let fixture = start(RelayMode::Validated);
        fixture.black.wait_sent(1).await;

        let mv = json!({"type": "MOVE", "move": {"from": "e2", "to": "e4", "promotion": "q"}, "room_id": "room_1"});
        fixture.white.push(mv.clone());

        let black = fixture.black.wait_sent(2).await;
        assert_eq!(serde_json::to_value(&black[1]).expect("json"), mv);
        assert_eq!(fixture.session.phase(), Phase::Active { turn: Role::SecondMover });

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_illegal_move_dropped_silently() {
        let fixture = start(RelayMode::Validated);
        fixture.black.wait_sent(1).await;

        fixture.white.push(json!({"type": "MOVE", "move": "e2e5"}));
        fixture.white.push(json!({"type": "CHAT", "text": "oops"}));

        let black = fixture.black.wait_sent(2).await;
        assert_eq!(kinds(&black), ["MATCH_FOUND", "CHAT"]);
        assert_eq!(kinds(&fixture.white.sent()), ["MATCH_FOUND"]);
        assert_eq!(fixture.session.phase(), Phase::Active { turn: Role::FirstMover });

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_out_of_turn_move_dropped_silently() {
        let fixture = start(RelayMode::Validated);
        fixture.white.wait_sent(1).await;

        fixture.black.push(json!({"type": "MOVE", "move": "e7e5"}));
        fixture.black.push(json!({"type": "CHAT", "text": "my turn?"}));

        let white = fixture.white.wait_sent(2).await;
        assert_eq!(kinds(&white), ["MATCH_FOUND", "CHAT"]);
        assert_eq!(kinds(&fixture.black.sent()), ["MATCH_FOUND"]);

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_malformed_move_dropped_silently() {
        let fixture = start(RelayMode::Validated);
        fixture.black.wait_sent(1).await;

        fixture.white.push(json!({"type": "MOVE"}));
        fixture.white.push(json!({"type": "CHAT", "text": "hm"}));

        let black = fixture.black.wait_sent(2).await;
        assert_eq!(kinds(&black), ["MATCH_FOUND", "CHAT"]);
        assert_eq!(kinds(&fixture.white.sent()), ["MATCH_FOUND"]);

        fixture.session.abort();
        fixture.task.await.expect("session task");
    }

    #[tokio::test]
    async fn test_flag_fall_ends_game_on_next_frame() {
        let fixture = start_with_clock(
            RelayMode::Validated,
            ClockConfig::new(Duration::from_millis(50), Duration::ZERO),
        );
        fixture.white.wait_sent(1).await;
        fixture.black.wait_sent(1).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        fixture.black.push(json!({"type": "CHAT", "text": "still there?"}));

        let reason = fixture.task.await.expect("session task");
        assert_eq!(reason, EndReason::TimeoutFirstMover);

        let white = fixture.white.sent();
        assert_eq!(kinds(&white), ["MATCH_FOUND", "CHAT", "GAME_OVER"]);
        assert_eq!(white[2].get("reason"), Some(&json!("TIMEOUT_FIRST_MOVER")));
        assert_eq!(white[2].get("white_ms"), Some(&json!(0)));
        assert_eq!(white[2].get("black_ms"), Some(&json!(50)));

        assert_eq!(kinds(&fixture.black.sent()), ["MATCH_FOUND", "GAME_OVER"]);
        assert!(fixture.white.is_closed());
        assert!(fixture.black.is_closed());
    }

    #[tokio::test]
    async fn test_decided_game_wins_over_late_departure() {
        let fixture = start(RelayMode::Validated);
        fixture.white.wait_sent(1).await;
        fixture.black.wait_sent(1).await;

        {
            let mut game = fixture.session.game.lock();
            for (role, notation) in [
                (Role::FirstMover, "f2f3"),
                (Role::SecondMover, "e7e5"),
                (Role::FirstMover, "g2g4"),
                (Role::SecondMover, "d8h4"),
            ] {
                game.handle_move_at(role, notation, Instant::now()).expect("legal move");
            }
        }

        fixture.white.fail_read();

        let reason = fixture.task.await.expect("session task");
        assert_eq!(reason, EndReason::Checkmate);
        assert_eq!(fixture.session.outcome(), Some(EndReason::Checkmate));

        let black = fixture.black.sent();
        assert_eq!(kinds(&black), ["MATCH_FOUND", "GAME_OVER"]);
        assert_eq!(black[1].get("reason"), Some(&json!("CHECKMATE")));
        assert!(!kinds(&fixture.white.sent()).contains(&"OPPONENT_LEFT"));
    }

    #[tokio::test]
    async fn test_mating_move_ends_game() {
        let fixture = start(RelayMode::Validated);
        fixture.white.wait_sent(1).await;
        fixture.black.wait_sent(1).await;

        fixture.white.push(json!({"type": "MOVE", "move": "f2f3"}));
        fixture.black.wait_sent(2).await;
        fixture.black.push(json!({"type": "MOVE", "move": "e7e5"}));
        fixture.white.wait_sent(2).await;
        fixture.white.push(json!({"type": "MOVE", "move": "g2g4"}));
        fixture.black.wait_sent(3).await;
        fixture.black.push(json!({"type": "MOVE", "move": "d8h4"}));

        let reason = fixture.task.await.expect("session task");
        assert_eq!(reason, EndReason::Checkmate);

        let white = fixture.white.sent();
        assert_eq!(kinds(&white), ["MATCH_FOUND", "MOVE", "MOVE", "GAME_OVER"]);
        assert_eq!(white[3].get("reason"), Some(&json!("CHECKMATE")));

        let black = fixture.black.sent();
        assert_eq!(kinds(&black), ["MATCH_FOUND", "MOVE", "MOVE", "GAME_OVER"]);
        assert!(black[3].get("white_ms").and_then(|v| v.as_u64()).is_some());

        assert!(fixture.white.is_closed());
        assert!(fixture.black.is_closed());
    }

    #[tokio::test]
    async fn test_unchecked_relays_illegal_move() {
        let fixture = start(RelayMode::Unchecked);
        fixture.black.wait_sent(1).await;

        fixture.white.push(json!({"type": "MOVE", "move": "e2e5"}));
        fixture.black.push(json!({"type": "MOVE", "move": "e7e5"}));

        let black = fixture.black.wait_sent(2).await;
        let white = fixture.white.wait_sent(2).await;
        assert_eq!(black[1].get("move"), Some(&json!("e2e5")));
        assert_eq!(white[1].get("move"), Some(&json!("e7e5")));

        fixture.session.abort();
        assert_eq!(fixture.task.await.expect("session task"), EndReason::OpponentLeft);
    }

    #[tokio::test]
    async fn test_unchecked_keeps_relaying_after_mate() {
        let fixture = start(RelayMode::Unchecked);
        fixture.white.wait_sent(1).await;
        fixture.black.wait_sent(1).await;

        fixture.white.push(json!({"type": "MOVE", "move": "f2f3"}));
        fixture.black.wait_sent(2).await;
        fixture.black.push(json!({"type": "MOVE", "move": "e7e5"}));
        fixture.white.wait_sent(2).await;
        fixture.white.push(json!({"type": "MOVE", "move": "g2g4"}));
        fixture.black.wait_sent(3).await;
        fixture.black.push(json!({"type": "MOVE", "move": "d8h4"}));

        let white = fixture.white.wait_sent(3).await;
        assert_eq!(white[2].get("move"), Some(&json!("d8h4")));
        assert_eq!(fixture.session.phase(), Phase::Ended(EndReason::Checkmate));
        assert_eq!(fixture.session.outcome(), None);

        fixture.white.push(json!({"type": "CHAT", "text": "gg"}));
        let black = fixture.black.wait_sent(4).await;
        assert_eq!(kinds(&black), ["MATCH_FOUND", "MOVE", "MOVE", "CHAT"]);
        assert!(!fixture.white.is_closed());

        fixture.session.abort();
        assert_eq!(fixture.task.await.expect("session task"), EndReason::OpponentLeft);
    }
}

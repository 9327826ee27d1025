//! One pairing sweep over a snapshot of the waiting pool.
//!
//! Greedy in snapshot order: each participant is probed, then paired with
//! the first later participant that has a different identity, is not yet
//! matched and passes its own probe. Anyone failing a probe is closed and
//! never returned.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashSet;
use tracing::{debug, info, trace};

use crate::identifiers::{ParticipantId, RoomId};
use crate::session::Role;

use super::Participant;

// ============================================================================
// Pairing
// ============================================================================

/// Two participants bound to a new room.
#[derive(Debug, Clone)]
pub struct Pairing {
    room_id: RoomId,
    first: Participant,
    second: Participant,
}

impl Pairing {
    /// Binds `first` (first mover) and `second` to a fresh room.
    #[must_use]
    pub fn bind(first: Participant, second: Participant) -> Self {
        let room_id = RoomId::generate();
        first.mark_in_session(room_id.clone());
        second.mark_in_session(room_id.clone());
        Self {
            room_id,
            first,
            second,
        }
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
        match role {
            Role::FirstMover => &self.first,
            Role::SecondMover => &self.second,
        }
    }

    /// Splits into room, first mover and second mover.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (RoomId, Participant, Participant) {
        (self.room_id, self.first, self.second)
    }
}

// ============================================================================
// SweepOutcome
// ============================================================================

/// Result of one sweep.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// New pairs, in creation order.
    pub pairings: Vec<Pairing>,
    /// Participants to return to the pool.
    pub unmatched: Vec<Participant>,
    /// Participants closed during the sweep.
    pub dropped: Vec<Participant>,
}

// ============================================================================
// Sweep
// ============================================================================

/// Pairs a snapshot of waiting participants.
///
/// Snapshots smaller than two come back unchanged without any probe.
pub async fn pair_snapshot(snapshot: Vec<Participant>, probe_timeout: Duration) -> SweepOutcome {
    let n = snapshot.len();
    if n < 2 {
        return SweepOutcome {
            unmatched: snapshot,
            ..SweepOutcome::default()
        };
    }

    debug!(waiting = n, "Pairing sweep");

    let mut matched: FxHashSet<ParticipantId> = FxHashSet::default();
    let mut dropped = vec![false; n];
    let mut paired = vec![false; n];
    let mut pairings = Vec::new();

    for i in 0..n {
        let first = &snapshot[i];
        if dropped[i] || matched.contains(first.id()) {
            continue;
        }

        if !is_alive(first, probe_timeout).await {
            dropped[i] = true;
            continue;
        }

        for j in (i + 1)..n {
            let second = &snapshot[j];
            if dropped[j] || matched.contains(second.id()) {
                continue;
            }

            if second.id() == first.id() {
                trace!(participant = %first.id(), "Skipping self-pairing");
                continue;
            }

            if !is_alive(second, probe_timeout).await {
                dropped[j] = true;
                continue;
            }

            matched.insert(first.id().clone());
            matched.insert(second.id().clone());
            paired[i] = true;
            paired[j] = true;

            let pairing = Pairing::bind(first.clone(), second.clone());
            info!(
                room = %pairing.room_id(),
                first = %first.id(),
                second = %second.id(),
                "Match created"
            );
            pairings.push(pairing);
            break;
        }
    }

    let mut outcome = SweepOutcome {
        pairings,
        ..SweepOutcome::default()
    };

    for (index, participant) in snapshot.into_iter().enumerate() {
        if paired[index] {
            continue;
        }

        if dropped[index] {
            outcome.dropped.push(participant);
        } else if matched.contains(participant.id()) {
            // Another connection of this identity was just paired
            debug!(
                participant = %participant.id(),
                connection = %participant.connection_id(),
                "Closing duplicate connection"
            );
            participant.close();
            participant.release();
            outcome.dropped.push(participant);
        } else {
            outcome.unmatched.push(participant);
        }
    }

    outcome
}

/// Probes `participant`, closing it on failure.
async fn is_alive(participant: &Participant, probe_timeout: Duration) -> bool {
    match participant.probe(probe_timeout).await {
        Ok(()) => true,
        Err(e) => {
            let cause = if e.is_timeout() { "probe timed out" } else { "connection gone" };
            info!(participant = %participant.id(), cause, error = %e, "Participant unavailable, removing");
            participant.close();
            participant.release();
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::matchmaking::Membership;
    use crate::test_support::MockConnection;

    const PROBE: Duration = Duration::from_millis(50);

    fn pool(names: &[&str]) -> (Vec<Participant>, Vec<Arc<MockConnection>>) {
        names.iter().map(|name| MockConnection::participant(name)).unzip()
    }

    fn ids(participants: &[Participant]) -> Vec<&str> {
        participants.iter().map(|p| p.id().as_str()).collect()
    }

    fn pair_ids(pairing: &Pairing) -> (&str, &str) {
        (
            pairing.participant(Role::FirstMover).id().as_str(),
            pairing.participant(Role::SecondMover).id().as_str(),
        )
    }

    #[tokio::test]
    async fn test_single_participant_untouched() {
        let (snapshot, mocks) = pool(&["alice"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert!(outcome.pairings.is_empty());
        assert_eq!(ids(&outcome.unmatched), ["alice"]);
        assert_eq!(mocks[0].probe_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let outcome = pair_snapshot(Vec::new(), PROBE).await;
        assert!(outcome.pairings.is_empty());
        assert!(outcome.unmatched.is_empty());
    }

    #[tokio::test]
    async fn test_two_participants_pair_in_order() {
        let (snapshot, _) = pool(&["alice", "bob"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert_eq!(outcome.pairings.len(), 1);
        let pairing = &outcome.pairings[0];
        assert_eq!(pair_ids(pairing), ("alice", "bob"));
        assert!(pairing.room_id().as_str().starts_with("room_"));
        for role in Role::BOTH {
            let participant = pairing.participant(role);
            assert_eq!(participant.membership(), Membership::InSession);
            assert_eq!(participant.room().as_ref(), Some(pairing.room_id()));
        }
    }

    #[tokio::test]
    async fn test_three_participants_leave_one_waiting() {
        let (snapshot, _) = pool(&["alice", "bob", "carol"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert_eq!(outcome.pairings.len(), 1);
        assert_eq!(pair_ids(&outcome.pairings[0]), ("alice", "bob"));
        assert_eq!(ids(&outcome.unmatched), ["carol"]);
    }

    #[tokio::test]
    async fn test_same_identity_never_self_pairs() {
        let (snapshot, mocks) = pool(&["alice", "alice"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert!(outcome.pairings.is_empty());
        assert_eq!(ids(&outcome.unmatched), ["alice", "alice"]);
        assert!(mocks.iter().all(|m| !m.is_closed()));
    }

    #[tokio::test]
    async fn test_duplicate_of_paired_identity_is_dropped() {
        let (snapshot, mocks) = pool(&["alice", "alice", "bob"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert_eq!(outcome.pairings.len(), 1);
        assert_eq!(pair_ids(&outcome.pairings[0]), ("alice", "bob"));
        assert!(outcome.unmatched.is_empty());
        assert_eq!(ids(&outcome.dropped), ["alice"]);
        assert!(mocks[1].is_closed());
        assert!(!mocks[0].is_closed());
    }

    #[tokio::test]
    async fn test_failed_first_probe_is_dropped() {
        let (snapshot, mocks) = pool(&["ghost", "alice", "bob"]);
        mocks[0].fail_probes();

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert_eq!(pair_ids(&outcome.pairings[0]), ("alice", "bob"));
        assert_eq!(ids(&outcome.dropped), ["ghost"]);
        assert!(outcome.unmatched.is_empty());
        assert!(mocks[0].is_closed());
    }

    #[tokio::test]
    async fn test_failed_candidate_probe_is_skipped() {
        let (snapshot, mocks) = pool(&["alice", "ghost", "bob"]);
        mocks[1].fail_probes();

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert_eq!(pair_ids(&outcome.pairings[0]), ("alice", "bob"));
        assert_eq!(ids(&outcome.dropped), ["ghost"]);
        assert_eq!(mocks[1].probe_count(), 1);
    }

    #[tokio::test]
    async fn test_lone_survivor_returns_to_pool() {
        let (snapshot, mocks) = pool(&["alice", "ghost"]);
        mocks[1].fail_probes();

        let outcome = pair_snapshot(snapshot, PROBE).await;

        assert!(outcome.pairings.is_empty());
        assert_eq!(ids(&outcome.unmatched), ["alice"]);
        assert_eq!(ids(&outcome.dropped), ["ghost"]);
    }

    #[tokio::test]
    async fn test_four_participants_make_two_pairs() {
        let (snapshot, _) = pool(&["a", "b", "c", "d"]);

        let outcome = pair_snapshot(snapshot, PROBE).await;

        let pairs: Vec<_> = outcome.pairings.iter().map(pair_ids).collect();
        assert_eq!(pairs, [("a", "b"), ("c", "d")]);
        assert_ne!(outcome.pairings[0].room_id(), outcome.pairings[1].room_id());
    }

    proptest! {
        #[test]
        fn prop_sweep_invariants(
            entries in prop::collection::vec((0u8..4, any::<bool>()), 0..12)
        ) {
            let mut snapshot = Vec::new();
            let mut mocks = Vec::new();
            for (name, alive) in &entries {
                let (participant, mock) = MockConnection::participant(&format!("p{name}"));
                if !alive {
                    mock.fail_probes();
                }
                snapshot.push(participant);
                mocks.push(mock);
            }
            let total = snapshot.len();

            let outcome = tokio_test::block_on(pair_snapshot(snapshot, PROBE));

            // Conservation
            prop_assert_eq!(
                outcome.pairings.len() * 2 + outcome.unmatched.len() + outcome.dropped.len(),
                total
            );

            // Disjoint pairs, no self-pairs
            let mut seen = FxHashSet::default();
            for pairing in &outcome.pairings {
                let first = pairing.participant(Role::FirstMover);
                let second = pairing.participant(Role::SecondMover);
                prop_assert_ne!(first.id(), second.id());
                prop_assert!(seen.insert(first.id().clone()));
                prop_assert!(seen.insert(second.id().clone()));
                prop_assert!(!first.is_closed() && !second.is_closed());
            }

            // Probe failures never reappear
            for participant in &outcome.unmatched {
                prop_assert!(!participant.is_closed());
                prop_assert!(!seen.contains(participant.id()));
            }
            for participant in &outcome.dropped {
                prop_assert!(participant.is_closed());
            }
            if total < 2 {
                prop_assert!(mocks.iter().all(|m| m.probe_count() == 0));
            }
        }
    }
}

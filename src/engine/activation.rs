//! Activation trigger: one assignment attempt for one sender
//!
//! Invoked when a participant's activation flag flips to true (the event
//! delivery is external) and by every sweep item. The result is tri-state:
//! assigned, skipped for an expected reason, or a hard error such as a
//! missing sender record.
//!
//! Cleanup of an overfilled receiver displaces other senders; those are
//! re-run here through an explicit FIFO queue with a visited set, bounding
//! what would otherwise be unbounded recursion through the guard.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use tracing::{error, info};

use crate::engine::selector::{OverrideSnapshot, Selection};
use crate::engine::{guard, writer, Engine};
use crate::types::{HelpmatchError, Result};

/// Expected non-assignment reasons. None of these are errors; all are
/// logged at info and counted as skips by the sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Sender is a system or reserved identity
    SystemSender,
    /// Sender already holds the maximum outstanding assignments
    SenderAtCap,
    /// Eligibility filter produced an empty pool
    NoEligibleReceiver,
    /// Forced override designates a system or reserved identity
    ForcedReceiverSystem,
    /// A live assignment for this sender→receiver pair already exists
    PairExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::SystemSender => "sender is a system identity",
            SkipReason::SenderAtCap => "sender at outstanding-assignment cap",
            SkipReason::NoEligibleReceiver => "no eligible receiver",
            SkipReason::ForcedReceiverSystem => "forced receiver is a system identity",
            SkipReason::PairExists => "assignment pair already exists",
        };
        f.write_str(s)
    }
}

/// Result of one assignment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned {
        assignment_id: String,
        receiver_id: String,
    },
    Skipped(SkipReason),
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignmentOutcome::Assigned { .. })
    }
}

impl Engine {
    /// Run one assignment attempt for `uid`, then drain any senders
    /// displaced by capacity cleanup along the way.
    ///
    /// The returned outcome is for `uid` itself; displaced-sender attempts
    /// are logged and their failures never propagate (a reassignment that
    /// cannot complete is picked up by the next backfill sweep).
    pub async fn assign_on_activation(&self, uid: &str) -> Result<AssignmentOutcome> {
        let mut displaced = VecDeque::new();
        let outcome = self.assign_once(uid, &mut displaced).await?;

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(uid.to_string());

        while let Some(next) = displaced.pop_front() {
            if !visited.insert(next.clone()) {
                continue;
            }
            match self.assign_once(&next, &mut displaced).await {
                Ok(AssignmentOutcome::Assigned { receiver_id, .. }) => {
                    info!(sender = %next, receiver = %receiver_id, "displaced sender reassigned");
                }
                Ok(AssignmentOutcome::Skipped(reason)) => {
                    info!(sender = %next, %reason, "displaced sender not reassigned");
                }
                Err(e) => {
                    error!(sender = %next, error = %e, "displaced sender reassignment failed");
                }
            }
        }

        Ok(outcome)
    }

    /// One assignment attempt, no queue draining.
    pub(crate) async fn assign_once(
        &self,
        uid: &str,
        displaced: &mut VecDeque<String>,
    ) -> Result<AssignmentOutcome> {
        if self.config().reserved.contains_uid(uid) {
            info!(sender = %uid, "system sender, skipping assignment");
            return Ok(AssignmentOutcome::Skipped(SkipReason::SystemSender));
        }

        let sender = self
            .store()
            .participant(uid)
            .await?
            .ok_or_else(|| HelpmatchError::MissingRecord(format!("sender uid {} not found", uid)))?;

        if self.config().reserved.is_reserved(&sender) {
            info!(sender = %sender.participant_id, "system sender, skipping assignment");
            return Ok(AssignmentOutcome::Skipped(SkipReason::SystemSender));
        }

        let outstanding = self.store().outbound_count(uid).await?;
        if outstanding >= self.config().max_outstanding_sends {
            info!(
                sender = %sender.participant_id,
                outstanding,
                "sender at outstanding cap, skipping assignment"
            );
            return Ok(AssignmentOutcome::Skipped(SkipReason::SenderAtCap));
        }

        let snapshot = OverrideSnapshot::read(self.store().as_ref()).await?;
        let receiver = match self.select_receiver(&sender, &snapshot, displaced).await? {
            Selection::Selected(receiver) => receiver,
            Selection::Skip(reason) => {
                info!(sender = %sender.participant_id, %reason, "no assignment made");
                return Ok(AssignmentOutcome::Skipped(reason));
            }
        };

        let assignment = match writer::write_pair(self.store().as_ref(), &sender, &receiver).await?
        {
            Some(assignment) => assignment,
            None => return Ok(AssignmentOutcome::Skipped(SkipReason::PairExists)),
        };

        // Recount after the write; the candidate snapshot may have raced
        // with another sender picking the same receiver.
        let count = self
            .store()
            .count_active_inbound(&receiver.participant_id)
            .await?;
        let receiver_now = self
            .store()
            .participant(&receiver.uid)
            .await?
            .unwrap_or(receiver);
        guard::enforce(self.store().as_ref(), &receiver_now, count, displaced).await?;

        Ok(AssignmentOutcome::Assigned {
            assignment_id: assignment.id,
            receiver_id: assignment.receiver_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{
        AssignmentDoc, ForceReceiverDoc, ParticipantDoc, SuspensionState,
    };
    use crate::engine::{Engine, EngineConfig};
    use crate::store::MemoryStore;
    use bson::DateTime;
    use std::sync::Arc;

    fn participant(uid: &str, pid: &str, referrals: i64) -> ParticipantDoc {
        ParticipantDoc {
            uid: uid.to_string(),
            participant_id: pid.to_string(),
            full_name: format!("Member {}", pid),
            level: "Star".to_string(),
            is_activated: true,
            is_blocked: false,
            suspension: Some(SuspensionState::Active),
            referral_count: referrals,
            registered_at: Some(DateTime::from_millis(1_700_000_000_000)),
            ..Default::default()
        }
    }

    fn engine(store: &Arc<MemoryStore>) -> Engine {
        Engine::new(store.clone(), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_assigns_and_holds_receiver_at_capacity() {
        // Star-level receiver with 2 of 3 slots used; one more assignment
        // fills it and the guard must hold it.
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        let receiver = participant("r1", "HHF000200", 5);
        store.insert_participant(sender.clone()).await;
        store.insert_participant(receiver.clone()).await;

        for i in 0..2 {
            let other = participant(&format!("x{}", i), &format!("HHF00030{}", i), 0);
            store.insert_participant(other.clone()).await;
            store.seed_pair(AssignmentDoc::pair(&other, &receiver)).await;
        }

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        match outcome {
            AssignmentOutcome::Assigned { receiver_id, .. } => {
                assert_eq!(receiver_id, "HHF000200");
            }
            other => panic!("expected assignment, got {:?}", other),
        }

        let held = store.participant_snapshot("r1").await.unwrap();
        assert_eq!(held.suspension, Some(SuspensionState::HeldCapacity));
        assert_eq!(store.live_outbound().await.len(), 3);
        assert_eq!(store.live_inbound().await.len(), 3);
    }

    #[tokio::test]
    async fn test_no_eligible_receiver_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender).await;

        let mut blocked = participant("r1", "HHF000200", 5);
        blocked.is_blocked = true;
        store.insert_participant(blocked).await;

        let mut held = participant("r2", "HHF000201", 4);
        held.suspension = Some(SuspensionState::HeldManual);
        store.insert_participant(held).await;

        let writes_before = store.write_count();
        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(
            outcome,
            AssignmentOutcome::Skipped(SkipReason::NoEligibleReceiver)
        );
        assert_eq!(store.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_forced_receiver_blocked_falls_back_to_normal_selection() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender).await;

        let mut forced = participant("f1", "HHF000500", 99);
        forced.is_blocked = true;
        store.insert_participant(forced).await;

        let normal = participant("r1", "HHF000200", 1);
        store.insert_participant(normal).await;

        store
            .set_force_receiver(ForceReceiverDoc {
                enabled: true,
                receiver_uid: "f1".to_string(),
                receiver_id: "HHF000500".to_string(),
                version: 7,
                ..Default::default()
            })
            .await;

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        match outcome {
            AssignmentOutcome::Assigned { receiver_id, .. } => {
                assert_eq!(receiver_id, "HHF000200");
            }
            other => panic!("expected fallback assignment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forced_receiver_selected_when_valid() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender).await;

        // Lower referral count than the normal candidate: override must win
        let forced = participant("f1", "HHF000500", 0);
        store.insert_participant(forced).await;
        let normal = participant("r1", "HHF000200", 50);
        store.insert_participant(normal).await;

        store
            .set_force_receiver(ForceReceiverDoc {
                enabled: true,
                receiver_uid: "f1".to_string(),
                receiver_id: "HHF000500".to_string(),
                version: 1,
                ..Default::default()
            })
            .await;

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        match outcome {
            AssignmentOutcome::Assigned { receiver_id, .. } => {
                assert_eq!(receiver_id, "HHF000500");
            }
            other => panic!("expected forced assignment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forced_receiver_system_identity_rejects() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender).await;
        let normal = participant("r1", "HHF000200", 1);
        store.insert_participant(normal).await;

        store
            .set_force_receiver(ForceReceiverDoc {
                enabled: true,
                receiver_uid: "sys".to_string(),
                receiver_id: "HHF000001".to_string(),
                ..Default::default()
            })
            .await;

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(
            outcome,
            AssignmentOutcome::Skipped(SkipReason::ForcedReceiverSystem)
        );
        assert!(store.live_outbound().await.is_empty());
    }

    #[tokio::test]
    async fn test_forced_receiver_missing_record_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender).await;

        store
            .set_force_receiver(ForceReceiverDoc {
                enabled: true,
                receiver_uid: "ghost".to_string(),
                receiver_id: "HHF000900".to_string(),
                ..Default::default()
            })
            .await;

        let result = engine(&store).assign_on_activation("s1").await;
        assert!(matches!(
            result,
            Err(crate::types::HelpmatchError::MissingRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_system_sender_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let mut sender = participant("s1", "HHF000001", 0);
        sender.is_system_user = true;
        store.insert_participant(sender).await;

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(outcome, AssignmentOutcome::Skipped(SkipReason::SystemSender));
    }

    #[tokio::test]
    async fn test_missing_sender_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let result = engine(&store).assign_on_activation("nope").await;
        assert!(matches!(
            result,
            Err(crate::types::HelpmatchError::MissingRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_sender_at_cap_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        store.insert_participant(sender.clone()).await;

        for i in 0..3 {
            let receiver = participant(&format!("r{}", i), &format!("HHF00020{}", i), 0);
            store.insert_participant(receiver.clone()).await;
            store.seed_pair(AssignmentDoc::pair(&sender, &receiver)).await;
        }

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(outcome, AssignmentOutcome::Skipped(SkipReason::SenderAtCap));
    }

    #[tokio::test]
    async fn test_never_assigns_to_self() {
        // Sender is also the only activated, unheld participant
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 10);
        store.insert_participant(sender).await;

        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(
            outcome,
            AssignmentOutcome::Skipped(SkipReason::NoEligibleReceiver)
        );
    }

    #[tokio::test]
    async fn test_forced_receiver_with_existing_pair_skips_write() {
        // The eligibility filter never sees the forced receiver, so the
        // writer's own pair-key check is the only duplicate guard here.
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        let receiver = participant("r1", "HHF000200", 5);
        store.insert_participant(sender.clone()).await;
        store.insert_participant(receiver.clone()).await;
        store.seed_pair(AssignmentDoc::pair(&sender, &receiver)).await;

        store
            .set_force_receiver(ForceReceiverDoc {
                enabled: true,
                receiver_uid: "r1".to_string(),
                receiver_id: "HHF000200".to_string(),
                version: 2,
                ..Default::default()
            })
            .await;

        let writes_before = store.write_count();
        let outcome = engine(&store).assign_on_activation("s1").await.unwrap();
        assert_eq!(outcome, AssignmentOutcome::Skipped(SkipReason::PairExists));
        assert_eq!(store.write_count(), writes_before);
        assert_eq!(store.live_outbound().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_pair_skipped_on_retry() {
        let store = Arc::new(MemoryStore::new());
        let sender = participant("s1", "HHF000100", 0);
        let receiver = participant("r1", "HHF000200", 5);
        store.insert_participant(sender).await;
        store.insert_participant(receiver).await;

        let eng = engine(&store);
        let first = eng.assign_on_activation("s1").await.unwrap();
        assert!(first.is_assigned());

        // Retry: the duplicate-pair rule empties the pool
        let second = eng.assign_on_activation("s1").await.unwrap();
        assert_eq!(
            second,
            AssignmentOutcome::Skipped(SkipReason::NoEligibleReceiver)
        );
        assert_eq!(store.live_outbound().await.len(), 1);
    }
}

//! In-memory [`MatchStore`] implementation
//!
//! Backs the engine's test suite and dry runs. Mirrors the MongoDB store's
//! semantics: soft deletes, missing-field suspension behavior, the same
//! ordering rules. Tracks a write counter so idempotence tests can assert
//! that a repeated sweep performs zero additional writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::schemas::{AssignmentDoc, ForceReceiverDoc, ParticipantDoc, SuspensionState};
use crate::store::MatchStore;
use crate::types::Result;

#[derive(Default)]
struct Inner {
    participants: HashMap<String, ParticipantDoc>,
    outbound: HashMap<String, AssignmentDoc>,
    inbound: HashMap<String, AssignmentDoc>,
    force_receiver: Option<ForceReceiverDoc>,
}

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating operations performed so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Seed a participant (keyed by uid)
    pub async fn insert_participant(&self, participant: ParticipantDoc) {
        let mut inner = self.inner.write().await;
        inner
            .participants
            .insert(participant.uid.clone(), participant);
    }

    /// Seed or replace the force-receiver override document
    pub async fn set_force_receiver(&self, config: ForceReceiverDoc) {
        self.inner.write().await.force_receiver = Some(config);
    }

    /// Seed an assignment pair directly, bypassing the writer
    pub async fn seed_pair(&self, assignment: AssignmentDoc) {
        let mut inner = self.inner.write().await;
        inner
            .outbound
            .insert(assignment.id.clone(), assignment.clone());
        inner.inbound.insert(assignment.id.clone(), assignment);
    }

    /// Fetch a participant without going through the trait (test helper)
    pub async fn participant_snapshot(&self, uid: &str) -> Option<ParticipantDoc> {
        self.inner.read().await.participants.get(uid).cloned()
    }

    /// All non-deleted outbound assignment records (test helper)
    pub async fn live_outbound(&self) -> Vec<AssignmentDoc> {
        self.inner
            .read()
            .await
            .outbound
            .values()
            .filter(|a| !a.metadata.is_deleted)
            .cloned()
            .collect()
    }

    /// All non-deleted inbound assignment records (test helper)
    pub async fn live_inbound(&self) -> Vec<AssignmentDoc> {
        self.inner
            .read()
            .await
            .inbound
            .values()
            .filter(|a| !a.metadata.is_deleted)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn participant(&self, uid: &str) -> Result<Option<ParticipantDoc>> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(uid)
            .filter(|p| !p.metadata.is_deleted)
            .cloned())
    }

    async fn receiver_candidates(&self, limit: i64) -> Result<Vec<ParticipantDoc>> {
        let inner = self.inner.read().await;
        let mut pool: Vec<ParticipantDoc> = inner
            .participants
            .values()
            .filter(|p| {
                !p.metadata.is_deleted
                    && p.is_activated
                    && !p.is_blocked
                    && p.suspension == Some(SuspensionState::Active)
            })
            .cloned()
            .collect();
        pool.sort_by(|a, b| b.referral_count.cmp(&a.referral_count));
        pool.truncate(limit.max(0) as usize);
        Ok(pool)
    }

    async fn activated_participants(&self) -> Result<Vec<ParticipantDoc>> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .values()
            .filter(|p| !p.metadata.is_deleted && p.is_activated)
            .cloned()
            .collect())
    }

    async fn all_participants(&self) -> Result<Vec<ParticipantDoc>> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .values()
            .filter(|p| !p.metadata.is_deleted)
            .cloned()
            .collect())
    }

    async fn set_suspension(&self, uid: &str, state: SuspensionState) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(p) = inner.participants.get_mut(uid) {
            p.suspension = Some(state);
            self.record_write();
        }
        Ok(())
    }

    async fn set_suspension_if_missing(&self, uid: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if let Some(p) = inner.participants.get_mut(uid) {
            if p.suspension.is_none() {
                p.suspension = Some(SuspensionState::Active);
                self.record_write();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn count_active_inbound(&self, receiver_id: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .await
            .outbound
            .values()
            .filter(|a| {
                !a.metadata.is_deleted
                    && a.receiver_id == receiver_id
                    && a.counts_against_capacity()
            })
            .count() as u64)
    }

    async fn pending_inbound_oldest_first(&self, receiver_id: &str) -> Result<Vec<AssignmentDoc>> {
        let inner = self.inner.read().await;
        let mut pending: Vec<AssignmentDoc> = inner
            .outbound
            .values()
            .filter(|a| {
                !a.metadata.is_deleted
                    && a.receiver_id == receiver_id
                    && a.status == crate::db::schemas::AssignmentStatus::Pending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending)
    }

    async fn outbound_count(&self, sender_uid: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .await
            .outbound
            .values()
            .filter(|a| !a.metadata.is_deleted && a.sender_uid == sender_uid)
            .count() as u64)
    }

    async fn outbound_active_count(&self, sender_uid: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .await
            .outbound
            .values()
            .filter(|a| {
                !a.metadata.is_deleted
                    && a.sender_uid == sender_uid
                    && a.counts_against_capacity()
            })
            .count() as u64)
    }

    async fn outbound_pair_exists(&self, pair_key: &str) -> Result<bool> {
        Ok(self.inner.read().await.outbound.values().any(|a| {
            !a.metadata.is_deleted && a.pair_key == pair_key && a.counts_against_capacity()
        }))
    }

    async fn outbound_receiver_ids(&self, sender_uid: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .await
            .outbound
            .values()
            .filter(|a| !a.metadata.is_deleted && a.sender_uid == sender_uid)
            .map(|a| a.receiver_id.clone())
            .collect())
    }

    async fn insert_pair(&self, assignment: AssignmentDoc) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .outbound
            .insert(assignment.id.clone(), assignment.clone());
        self.record_write();
        inner.inbound.insert(assignment.id.clone(), assignment);
        self.record_write();
        Ok(())
    }

    async fn delete_pair(&self, assignment_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(a) = inner.outbound.get_mut(assignment_id) {
            a.metadata.is_deleted = true;
            self.record_write();
        }
        if let Some(a) = inner.inbound.get_mut(assignment_id) {
            a.metadata.is_deleted = true;
            self.record_write();
        }
        Ok(())
    }

    async fn force_receiver(&self) -> Result<Option<ForceReceiverDoc>> {
        Ok(self.inner.read().await.force_receiver.clone())
    }
}

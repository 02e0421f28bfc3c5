//! Store contract for the matching engine
//!
//! The engine talks to the document store through [`MatchStore`], which
//! captures exactly the query capability the store contract allows:
//! document-by-id fetch, equality and `$in` filters, single-field ordering,
//! result limits. No multi-document transaction is offered or used; the
//! paired assignment writes are two independent operations and the
//! reconciliation sweep is the compensating mechanism.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;

use crate::db::schemas::{AssignmentDoc, ForceReceiverDoc, ParticipantDoc, SuspensionState};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoMatchStore;

/// Document store operations required by the matching engine
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Fetch one participant by internal uid
    async fn participant(&self, uid: &str) -> Result<Option<ParticipantDoc>>;

    /// Top-N receiver candidates: activated, unblocked, suspension `Active`,
    /// ordered by referral count descending. System accounts are NOT
    /// filtered here; the eligibility filter excludes them in memory.
    async fn receiver_candidates(&self, limit: i64) -> Result<Vec<ParticipantDoc>>;

    /// All activated participants (the backfill scan)
    async fn activated_participants(&self) -> Result<Vec<ParticipantDoc>>;

    /// Every participant, including inactive ones (the repair scan)
    async fn all_participants(&self) -> Result<Vec<ParticipantDoc>>;

    /// Overwrite a participant's suspension state
    async fn set_suspension(&self, uid: &str, state: SuspensionState) -> Result<()>;

    /// Initialize a missing suspension field to `Active`. Returns whether a
    /// write happened; a no-op on documents that already carry the field.
    async fn set_suspension_if_missing(&self, uid: &str) -> Result<bool>;

    /// Count non-terminal (pending or confirmed) assignments toward a
    /// receiver, by external member id
    async fn count_active_inbound(&self, receiver_id: &str) -> Result<u64>;

    /// Pending assignments toward a receiver, oldest first by creation time
    async fn pending_inbound_oldest_first(&self, receiver_id: &str) -> Result<Vec<AssignmentDoc>>;

    /// Count of a sender's outbound assignments, any status
    async fn outbound_count(&self, sender_uid: &str) -> Result<u64>;

    /// Count of a sender's live (pending or confirmed) outbound
    /// assignments. The backfill sweep short-circuits on this: a sender
    /// with a live assignment chain already has what backfill would give it.
    async fn outbound_active_count(&self, sender_uid: &str) -> Result<u64>;

    /// Whether a non-deleted assignment already exists for this
    /// sender→receiver pair (the writer's pre-write idempotency check)
    async fn outbound_pair_exists(&self, pair_key: &str) -> Result<bool>;

    /// External ids of receivers this sender already has assignments toward
    async fn outbound_receiver_ids(&self, sender_uid: &str) -> Result<Vec<String>>;

    /// Write both sides of an assignment pair. The two writes are
    /// independent; a failure between them leaves a sweep-repairable state.
    async fn insert_pair(&self, assignment: AssignmentDoc) -> Result<()>;

    /// Soft-delete both sides of an assignment pair
    async fn delete_pair(&self, assignment_id: &str) -> Result<()>;

    /// Read the force-receiver override document, if present
    async fn force_receiver(&self) -> Result<Option<ForceReceiverDoc>>;
}

//! Capacity guard: post-write recount and suspend
//!
//! Runs after every assignment write with a fresh inbound count. No lock
//! prevents two concurrent writers from briefly overshooting a receiver's
//! capacity; the guard is pessimistic instead, suspending the receiver the
//! moment the recount reaches capacity and handing the surplus to excess
//! cleanup. This is the only path that suspends a receiver automatically.

use std::collections::VecDeque;

use tracing::info;

use crate::db::schemas::{ParticipantDoc, SuspensionState};
use crate::engine::{levels, sweep};
use crate::store::MatchStore;
use crate::types::Result;

/// Suspend the receiver if its inbound count has reached level capacity, and
/// run excess cleanup for it. Returns whether the receiver is (now) held.
///
/// Idempotent: re-applying to an already-held receiver skips the flag write
/// but still runs cleanup, since cleanup targets may have grown meanwhile.
/// Operator holds and payment blocks are never downgraded to a capacity hold.
pub async fn enforce(
    store: &dyn MatchStore,
    receiver: &ParticipantDoc,
    count: u64,
    displaced: &mut VecDeque<String>,
) -> Result<bool> {
    let capacity = levels::capacity_for(&receiver.level);
    if count < capacity {
        return Ok(false);
    }

    match receiver.suspension {
        Some(SuspensionState::HeldManual) | Some(SuspensionState::BlockedPayment) => {}
        Some(SuspensionState::HeldCapacity) => {}
        Some(SuspensionState::Active) | None => {
            store
                .set_suspension(&receiver.uid, SuspensionState::HeldCapacity)
                .await?;
            info!(
                receiver = %receiver.participant_id,
                count,
                capacity,
                "receiver reached capacity, held"
            );
        }
    }

    let stats = sweep::cleanup_excess(store, &receiver.participant_id, capacity, displaced).await?;
    if stats.deleted_pairs > 0 {
        info!(
            receiver = %receiver.participant_id,
            deleted = stats.deleted_pairs,
            requeued = stats.requeued_senders,
            "excess pending assignments cleaned up"
        );
    }

    Ok(true)
}

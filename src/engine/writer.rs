//! Assignment writer: creates the paired send/receive records
//!
//! Both sides of a pair share one generated UUID and a `pair_key` derived
//! from the two parties' external ids. The pre-write existence check on the
//! pair key makes a retried call a no-op instead of a double write, which
//! the legacy millisecond-timestamp ids could not guarantee.

use tracing::info;

use crate::db::schemas::{AssignmentDoc, ParticipantDoc};
use crate::store::MatchStore;
use crate::types::Result;

/// Write the assignment pair for a validated sender and receiver.
///
/// Returns `None` when a live assignment for this pair already exists (a
/// retry or a concurrent duplicate), in which case nothing is written.
pub async fn write_pair(
    store: &dyn MatchStore,
    sender: &ParticipantDoc,
    receiver: &ParticipantDoc,
) -> Result<Option<AssignmentDoc>> {
    let pair_key = AssignmentDoc::pair_key_for(&receiver.participant_id, &sender.participant_id);
    if store.outbound_pair_exists(&pair_key).await? {
        info!(
            sender = %sender.participant_id,
            receiver = %receiver.participant_id,
            "assignment pair already exists, skipping write"
        );
        return Ok(None);
    }

    let assignment = AssignmentDoc::pair(sender, receiver);
    store.insert_pair(assignment.clone()).await?;

    info!(
        assignment = %assignment.id,
        sender = %assignment.sender_id,
        receiver = %assignment.receiver_id,
        amount = assignment.amount,
        "assignment pair created"
    );

    Ok(Some(assignment))
}

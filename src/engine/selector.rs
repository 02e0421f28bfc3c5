//! Assignment selector: forced-override path plus normal selection
//!
//! The force-receiver override is read once per assignment call into an
//! [`OverrideSnapshot`] and passed in explicitly, so the point-in-time
//! nature of the read (and the re-validation that guards against a stale
//! snapshot) is visible at the call site.

use std::collections::VecDeque;

use tracing::{info, warn};

use crate::db::schemas::{ForceReceiverDoc, ParticipantDoc};
use crate::engine::activation::SkipReason;
use crate::engine::{guard, levels, Engine};
use crate::store::MatchStore;
use crate::types::{HelpmatchError, Result};

/// Point-in-time read of the force-receiver override document
#[derive(Debug, Clone, Default)]
pub struct OverrideSnapshot {
    pub config: Option<ForceReceiverDoc>,
}

impl OverrideSnapshot {
    /// Read the current override state from the store
    pub async fn read(store: &dyn MatchStore) -> Result<Self> {
        Ok(Self {
            config: store.force_receiver().await?,
        })
    }

    /// The override, if enabled and naming a complete receiver identity
    pub fn active(&self) -> Option<&ForceReceiverDoc> {
        self.config.as_ref().filter(|c| c.is_actionable())
    }
}

/// Outcome of receiver selection for one sender
pub(crate) enum Selection {
    Selected(ParticipantDoc),
    Skip(SkipReason),
}

impl Engine {
    /// Pick a receiver for `sender`: forced override first, then the
    /// eligibility filter's top candidate.
    ///
    /// Senders displaced by a capacity cleanup on the forced receiver are
    /// pushed onto `displaced` for the caller to re-run.
    pub(crate) async fn select_receiver(
        &self,
        sender: &ParticipantDoc,
        snapshot: &OverrideSnapshot,
        displaced: &mut VecDeque<String>,
    ) -> Result<Selection> {
        if let Some(forced) = snapshot.active() {
            match self.try_forced_receiver(sender, forced, displaced).await? {
                ForcedResult::Selected(receiver) => return Ok(Selection::Selected(receiver)),
                ForcedResult::Reject(reason) => return Ok(Selection::Skip(reason)),
                ForcedResult::FallThrough => {}
            }
        }

        let candidates = self.filter().candidates(self.store().as_ref(), sender).await?;
        match candidates.into_iter().next() {
            Some(receiver) => Ok(Selection::Selected(receiver)),
            None => Ok(Selection::Skip(SkipReason::NoEligibleReceiver)),
        }
    }

    /// Re-validate the designated receiver against its authoritative record.
    ///
    /// The override document may be stale: the receiver may have been
    /// blocked, held, or filled up since the operator set it. Any
    /// re-validation failure falls through to normal selection; forced
    /// assignment is best-effort by design.
    async fn try_forced_receiver(
        &self,
        sender: &ParticipantDoc,
        forced: &ForceReceiverDoc,
        displaced: &mut VecDeque<String>,
    ) -> Result<ForcedResult> {
        let reserved = &self.config().reserved;
        if reserved.contains_uid(&forced.receiver_uid)
            || reserved.contains_participant_id(&forced.receiver_id)
        {
            info!(
                receiver = %forced.receiver_id,
                "forced receiver is a reserved identity, skipping assignment"
            );
            return Ok(ForcedResult::Reject(SkipReason::ForcedReceiverSystem));
        }

        let receiver = self
            .store()
            .participant(&forced.receiver_uid)
            .await?
            .ok_or_else(|| {
                HelpmatchError::MissingRecord(format!(
                    "forced receiver uid {} not found",
                    forced.receiver_uid
                ))
            })?;

        if self.config().reserved.is_reserved(&receiver) {
            info!(
                receiver = %receiver.participant_id,
                "forced receiver record is a system account, skipping assignment"
            );
            return Ok(ForcedResult::Reject(SkipReason::ForcedReceiverSystem));
        }

        if !receiver.can_receive() || receiver.uid == sender.uid {
            warn!(
                receiver = %receiver.participant_id,
                override_version = forced.version,
                "forced receiver failed re-validation, using normal selection"
            );
            return Ok(ForcedResult::FallThrough);
        }

        // Fresh authoritative count; the snapshot says nothing about load
        let count = self
            .store()
            .count_active_inbound(&receiver.participant_id)
            .await?;
        let capacity = levels::capacity_for(&receiver.level);
        if count >= capacity {
            warn!(
                receiver = %receiver.participant_id,
                count,
                capacity,
                "forced receiver at capacity, holding and using normal selection"
            );
            guard::enforce(self.store().as_ref(), &receiver, count, displaced).await?;
            return Ok(ForcedResult::FallThrough);
        }

        info!(
            sender = %sender.participant_id,
            receiver = %receiver.participant_id,
            override_version = forced.version,
            "forced receiver selected"
        );
        Ok(ForcedResult::Selected(receiver))
    }
}

enum ForcedResult {
    Selected(ParticipantDoc),
    Reject(SkipReason),
    FallThrough,
}

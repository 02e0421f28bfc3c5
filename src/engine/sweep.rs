//! Reconciliation sweep: backfill, excess cleanup, orphan repair
//!
//! All three operations are idempotent and safe to re-run against partial
//! completion: on already-consistent data a second run performs zero
//! writes. One participant's failure never aborts a sweep; it is logged,
//! counted, and the sweep moves on.

use std::collections::VecDeque;
use std::fmt;

use tracing::{error, info};

use crate::db::schemas::ParticipantDoc;
use crate::engine::{AssignmentOutcome, Engine};
use crate::store::MatchStore;
use crate::types::Result;

/// Outcome totals for one sweep run
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    /// Participants examined
    pub processed: u64,
    /// New assignments created
    pub assigned: u64,
    /// Expected non-assignments
    pub skipped: u64,
    /// Per-item errors caught and passed over
    pub failed: u64,
    /// Which participants were skipped, and why
    pub skipped_items: Vec<SkippedItem>,
}

/// One skipped participant with its reason
#[derive(Debug, Clone)]
pub struct SkippedItem {
    pub participant_id: String,
    pub reason: String,
}

impl SweepSummary {
    fn record_skip(&mut self, participant_id: &str, reason: impl fmt::Display) {
        self.skipped += 1;
        self.skipped_items.push(SkippedItem {
            participant_id: participant_id.to_string(),
            reason: reason.to_string(),
        });
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, assigned {}, skipped {}, failed {}",
            self.processed, self.assigned, self.skipped, self.failed
        )
    }
}

/// Outcome totals for the orphan-repair migration
#[derive(Debug, Clone, Default)]
pub struct RepairSummary {
    /// Participants examined
    pub scanned: u64,
    /// Suspension fields initialized
    pub initialized: u64,
    /// Per-item errors caught and passed over
    pub failed: u64,
}

impl fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, initialized {}, failed {}",
            self.scanned, self.initialized, self.failed
        )
    }
}

/// Counts from one excess-cleanup pass
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStats {
    pub deleted_pairs: u64,
    pub requeued_senders: u64,
}

/// Remove a receiver's pending assignments beyond its capacity.
///
/// Oldest-first retention: the `capacity` earliest-created assignments
/// survive. Every surplus pair is soft-deleted; surplus pairs carrying
/// proof of payment additionally queue their sender for reassignment so
/// the sender is not left stranded.
pub async fn cleanup_excess(
    store: &dyn MatchStore,
    receiver_id: &str,
    capacity: u64,
    displaced: &mut VecDeque<String>,
) -> Result<CleanupStats> {
    let pending = store.pending_inbound_oldest_first(receiver_id).await?;
    let mut stats = CleanupStats::default();

    if pending.len() <= capacity as usize {
        return Ok(stats);
    }

    for surplus in &pending[capacity as usize..] {
        store.delete_pair(&surplus.id).await?;
        stats.deleted_pairs += 1;
        if surplus.has_payment_proof() {
            displaced.push_back(surplus.sender_uid.clone());
            stats.requeued_senders += 1;
            info!(
                assignment = %surplus.id,
                sender = %surplus.sender_id,
                receiver = %receiver_id,
                "surplus paid assignment removed, sender queued for reassignment"
            );
        } else {
            info!(
                assignment = %surplus.id,
                sender = %surplus.sender_id,
                receiver = %receiver_id,
                "surplus unpaid assignment removed"
            );
        }
    }

    Ok(stats)
}

impl Engine {
    /// Backfill assignments for every activated, unblocked, unsuspended
    /// sender that has no live assignment chain.
    pub async fn backfill_active(&self) -> Result<SweepSummary> {
        let senders: Vec<ParticipantDoc> = self
            .store()
            .activated_participants()
            .await?
            .into_iter()
            .filter(|p| !p.is_blocked && p.suspension == Some(crate::db::schemas::SuspensionState::Active))
            .collect();
        self.backfill(senders, "backfill-active").await
    }

    /// Backfill for every activated sender, suspended or not. The wider
    /// scan used when catching up after an outage; the same short-circuits
    /// apply per sender.
    pub async fn backfill_all(&self) -> Result<SweepSummary> {
        let senders = self.store().activated_participants().await?;
        self.backfill(senders, "backfill-all").await
    }

    async fn backfill(&self, senders: Vec<ParticipantDoc>, label: &str) -> Result<SweepSummary> {
        info!(sweep = label, senders = senders.len(), "sweep started");
        let mut summary = SweepSummary::default();

        for sender in senders {
            summary.processed += 1;

            // A sender with a live chain already has what backfill would
            // create; counting total history against the fixed cap as well
            // keeps retired senders out of rotation.
            let active = match self.store().outbound_active_count(&sender.uid).await {
                Ok(n) => n,
                Err(e) => {
                    summary.failed += 1;
                    error!(sender = %sender.participant_id, error = %e, "sweep item failed");
                    continue;
                }
            };
            if active >= 1 {
                summary.record_skip(&sender.participant_id, "already has a live assignment");
                continue;
            }

            match self.assign_on_activation(&sender.uid).await {
                Ok(AssignmentOutcome::Assigned { receiver_id, .. }) => {
                    summary.assigned += 1;
                    info!(
                        sweep = label,
                        sender = %sender.participant_id,
                        receiver = %receiver_id,
                        "assignment created"
                    );
                }
                Ok(AssignmentOutcome::Skipped(reason)) => {
                    summary.record_skip(&sender.participant_id, reason);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        sweep = label,
                        sender = %sender.participant_id,
                        error = %e,
                        "sweep item failed"
                    );
                }
            }
        }

        info!(sweep = label, %summary, "sweep complete");
        Ok(summary)
    }

    /// Initialize missing suspension fields to `Active`.
    ///
    /// Documents written before the field existed fail boolean-style
    /// equality queries; this one-time migration makes them visible again.
    /// Re-running on repaired data performs zero writes.
    pub async fn repair_missing_suspension(&self) -> Result<RepairSummary> {
        let participants = self.store().all_participants().await?;
        let mut summary = RepairSummary::default();

        for participant in participants {
            summary.scanned += 1;
            if participant.suspension.is_some() {
                continue;
            }
            match self.store().set_suspension_if_missing(&participant.uid).await {
                Ok(true) => {
                    summary.initialized += 1;
                    info!(
                        participant = %participant.participant_id,
                        "suspension field initialized"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        participant = %participant.participant_id,
                        error = %e,
                        "suspension repair failed"
                    );
                }
            }
        }

        info!(%summary, "suspension repair complete");
        Ok(summary)
    }
}

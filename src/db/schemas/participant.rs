//! Participant document schema
//!
//! A tiered actor in the payment circle. Activation and blocking are flipped
//! by external processes (registration, operator action); the `suspension`
//! state is written only by the capacity guard and the reconciliation sweep.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::assignment::PaymentDetails;
use crate::db::schemas::Metadata;

/// Collection name for participants
pub const PARTICIPANT_COLLECTION: &str = "participants";

/// Suspension state of a participant as a receiver.
///
/// Replaces the legacy trio of overlapping booleans (`isOnHold`,
/// `isReceivingHeld`, `paymentBlocked`). Any value other than `Active`
/// excludes the participant from receiver selection. `HeldCapacity` is the
/// only value the engine sets itself; the other held states belong to
/// operator tooling and the payment flow and are read-only here.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionState {
    /// Eligible to receive new assignments
    Active,
    /// Held automatically after reaching level capacity
    HeldCapacity,
    /// Held by an operator
    HeldManual,
    /// Suspended over a payment dispute
    BlockedPayment,
}

impl SuspensionState {
    /// BSON string value, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspensionState::Active => "active",
            SuspensionState::HeldCapacity => "held_capacity",
            SuspensionState::HeldManual => "held_manual",
            SuspensionState::BlockedPayment => "blocked_payment",
        }
    }
}

/// Participant document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ParticipantDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Internal identifier (auth provider uid)
    pub uid: String,

    /// External-facing member id (e.g. "HHF000123")
    pub participant_id: String,

    /// Display name, denormalized into assignment snapshots
    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub whatsapp: String,

    #[serde(default)]
    pub email: String,

    /// Tier determining inbound capacity (Star, Silver, Gold, ...)
    #[serde(default = "default_level")]
    pub level: String,

    /// Flipped by the external activation process
    #[serde(default)]
    pub is_activated: bool,

    /// Operator-set block, independent of suspension
    #[serde(default)]
    pub is_blocked: bool,

    /// Suspension state; `None` on documents written before the field
    /// existed. The orphan-repair sweep initializes those to `Active`.
    /// A missing value counts as ineligible until repaired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspension: Option<SuspensionState>,

    /// Confirmed inbound assignments counter
    #[serde(default)]
    pub help_received: i64,

    /// Referral counter, the primary selection priority
    #[serde(default)]
    pub referral_count: i64,

    /// System/seed accounts are never selected as receivers
    #[serde(default)]
    pub is_system_user: bool,

    /// How this participant gets paid; snapshotted into assignments
    #[serde(default)]
    pub payment_method: PaymentDetails,

    /// Registration time, the selection tie-breaker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime>,
}

fn default_level() -> String {
    "Star".to_string()
}

impl ParticipantDoc {
    /// Whether this participant is clear to receive new assignments.
    ///
    /// Requires the suspension field to be present: documents predating the
    /// field fail this check until the repair sweep initializes them.
    pub fn can_receive(&self) -> bool {
        self.is_activated
            && !self.is_blocked
            && self.suspension == Some(SuspensionState::Active)
            && !self.is_system_user
    }
}

impl IntoIndexes for ParticipantDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "uid": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("uid_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "participant_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("participant_id_unique".to_string())
                        .build(),
                ),
            ),
            // Candidate query: activation + suspension predicates, ordered
            // by referral count descending
            (
                doc! { "is_activated": 1, "suspension": 1, "referral_count": -1 },
                Some(
                    IndexOptions::builder()
                        .name("receiver_candidates".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ParticipantDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

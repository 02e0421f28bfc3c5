//! Assignment document schema
//!
//! One obligation is recorded twice: an outbound record conceptually owned by
//! the sender and an inbound record owned by the receiver, sharing one
//! document id. The two writes are independent (the store offers no
//! cross-document transaction); the reconciliation sweep repairs a pair where
//! only one side landed.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::participant::ParticipantDoc;
use crate::db::schemas::Metadata;

/// Collection of send-side assignment records (source: "sendHelp")
pub const ASSIGNMENTS_OUTBOUND: &str = "assignments_outbound";

/// Collection of receive-side assignment records (source: "receiveHelp")
pub const ASSIGNMENTS_INBOUND: &str = "assignments_inbound";

/// Fixed obligation amount
pub const ASSIGNMENT_AMOUNT: i64 = 300;

/// Assignment lifecycle status.
///
/// Deletion is not a status: cleaned-up pairs are soft-deleted via metadata.
/// Once a record leaves `Pending`, only status/confirmation fields change.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// Payment details: how a receiver is paid, and later the sender's proof.
///
/// On a participant this is their standing payment method. On an assignment
/// it starts as a snapshot of the receiver's method and accrues the sender's
/// UTR number and screenshot URL once payment is made. A screenshot URL is
/// the proof-of-payment marker the excess-cleanup pass keys on.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PaymentDetails {
    #[serde(default)]
    pub method: String,

    #[serde(default)]
    pub utr_number: String,

    #[serde(default)]
    pub screenshot_url: String,

    #[serde(default)]
    pub bank: BankDetails,

    #[serde(default)]
    pub upi: UpiDetails,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BankDetails {
    #[serde(default)]
    pub account_number: String,

    #[serde(default)]
    pub bank_name: String,

    #[serde(default)]
    pub ifsc_code: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpiDetails {
    #[serde(default)]
    pub gpay: String,

    #[serde(default)]
    pub phone_pe: String,

    #[serde(default)]
    pub upi: String,
}

/// Assignment document, written identically to both collections
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssignmentDoc {
    /// Generated UUID shared by both sides of the pair
    #[serde(rename = "_id")]
    pub id: String,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Sender→receiver relationship key, the pre-write idempotency check.
    /// Format: `{receiver_id}_{sender_id}`.
    pub pair_key: String,

    pub amount: i64,

    pub status: AssignmentStatus,

    #[serde(default)]
    pub confirmed_by_receiver: bool,

    pub created_at: DateTime,

    // Sender snapshot at creation time. Deliberately not kept in sync with
    // later profile edits.
    pub sender_uid: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_phone: String,
    #[serde(default)]
    pub sender_whatsapp: String,
    #[serde(default)]
    pub sender_email: String,

    // Receiver snapshot at creation time.
    pub receiver_uid: String,
    pub receiver_id: String,
    #[serde(default)]
    pub receiver_name: String,
    #[serde(default)]
    pub receiver_phone: String,
    #[serde(default)]
    pub receiver_whatsapp: String,
    #[serde(default)]
    pub receiver_email: String,

    /// Receiver's payment method snapshot, later the sender's proof
    #[serde(default)]
    pub payment_details: PaymentDetails,
}

impl Default for AssignmentDoc {
    fn default() -> Self {
        Self {
            id: String::new(),
            metadata: Metadata::default(),
            pair_key: String::new(),
            amount: ASSIGNMENT_AMOUNT,
            status: AssignmentStatus::Pending,
            confirmed_by_receiver: false,
            created_at: DateTime::now(),
            sender_uid: String::new(),
            sender_id: String::new(),
            sender_name: String::new(),
            sender_phone: String::new(),
            sender_whatsapp: String::new(),
            sender_email: String::new(),
            receiver_uid: String::new(),
            receiver_id: String::new(),
            receiver_name: String::new(),
            receiver_phone: String::new(),
            receiver_whatsapp: String::new(),
            receiver_email: String::new(),
            payment_details: PaymentDetails::default(),
        }
    }
}

impl AssignmentDoc {
    /// Build a fresh pending assignment from both parties' current records.
    pub fn pair(sender: &ParticipantDoc, receiver: &ParticipantDoc) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            pair_key: Self::pair_key_for(&receiver.participant_id, &sender.participant_id),
            amount: ASSIGNMENT_AMOUNT,
            status: AssignmentStatus::Pending,
            confirmed_by_receiver: false,
            created_at: DateTime::now(),
            sender_uid: sender.uid.clone(),
            sender_id: sender.participant_id.clone(),
            sender_name: sender.full_name.clone(),
            sender_phone: sender.phone.clone(),
            sender_whatsapp: sender.whatsapp.clone(),
            sender_email: sender.email.clone(),
            receiver_uid: receiver.uid.clone(),
            receiver_id: receiver.participant_id.clone(),
            receiver_name: receiver.full_name.clone(),
            receiver_phone: receiver.phone.clone(),
            receiver_whatsapp: receiver.whatsapp.clone(),
            receiver_email: receiver.email.clone(),
            payment_details: receiver.payment_method.clone(),
        }
    }

    /// Relationship key for the duplicate-pair check
    pub fn pair_key_for(receiver_id: &str, sender_id: &str) -> String {
        format!("{}_{}", receiver_id, sender_id)
    }

    /// Whether the sender has attached proof of payment
    pub fn has_payment_proof(&self) -> bool {
        !self.payment_details.screenshot_url.is_empty()
    }

    /// Non-terminal statuses counted against receiver capacity
    pub fn counts_against_capacity(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Pending | AssignmentStatus::Confirmed
        )
    }
}

impl IntoIndexes for AssignmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Duplicate-pair and retry checks
            (
                doc! { "pair_key": 1 },
                Some(
                    IndexOptions::builder()
                        .name("pair_key_index".to_string())
                        .build(),
                ),
            ),
            // Capacity counts and cleanup scans
            (
                doc! { "receiver_id": 1, "status": 1, "created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("receiver_status_created".to_string())
                        .build(),
                ),
            ),
            // Backfill short-circuit
            (
                doc! { "sender_uid": 1 },
                Some(
                    IndexOptions::builder()
                        .name("sender_uid_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AssignmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

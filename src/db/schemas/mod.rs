//! Document schemas for the matching engine's collections.

pub mod assignment;
pub mod metadata;
pub mod override_config;
pub mod participant;

pub use assignment::{
    AssignmentDoc, AssignmentStatus, BankDetails, PaymentDetails, UpiDetails, ASSIGNMENTS_INBOUND,
    ASSIGNMENTS_OUTBOUND, ASSIGNMENT_AMOUNT,
};
pub use metadata::Metadata;
pub use override_config::{ForceReceiverDoc, FORCE_RECEIVER_DOC_ID, GLOBAL_SETTINGS_COLLECTION};
pub use participant::{ParticipantDoc, SuspensionState, PARTICIPANT_COLLECTION};

//! Force-receiver override configuration document
//!
//! A single operator-maintained document preempting normal receiver
//! selection. The engine reads it once per assignment call into a snapshot;
//! the version counter makes staleness of that snapshot observable in logs
//! and tests.

use bson::Document;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection holding singleton configuration documents
pub const GLOBAL_SETTINGS_COLLECTION: &str = "global_settings";

/// Document id of the force-receiver override
pub const FORCE_RECEIVER_DOC_ID: &str = "force_receiver";

/// Force-receiver override document (source: "globalSettings/forceReceiver")
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ForceReceiverDoc {
    #[serde(rename = "_id", default = "default_doc_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Whether the override is in effect
    #[serde(default)]
    pub enabled: bool,

    /// Designated receiver's internal uid
    #[serde(default)]
    pub receiver_uid: String,

    /// Designated receiver's external member id
    #[serde(default)]
    pub receiver_id: String,

    /// Bumped on every operator write; read-then-act staleness marker
    #[serde(default)]
    pub version: i64,
}

fn default_doc_id() -> String {
    FORCE_RECEIVER_DOC_ID.to_string()
}

impl ForceReceiverDoc {
    /// Whether the override names a complete receiver identity
    pub fn is_actionable(&self) -> bool {
        self.enabled && !self.receiver_uid.is_empty() && !self.receiver_id.is_empty()
    }
}

impl IntoIndexes for ForceReceiverDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}

impl MutMetadata for ForceReceiverDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! MongoDB-backed [`MatchStore`] implementation
//!
//! Collection layout mirrors the legacy system: participants, paired
//! outbound/inbound assignment collections sharing document ids, and a
//! singleton override document in `global_settings`. Capacity counts and
//! cleanup scans read the outbound collection keyed by `receiver_id`, the
//! same side the legacy queries used.

use async_trait::async_trait;
use bson::doc;

use crate::db::schemas::{
    AssignmentDoc, ForceReceiverDoc, ParticipantDoc, SuspensionState, ASSIGNMENTS_INBOUND,
    ASSIGNMENTS_OUTBOUND, FORCE_RECEIVER_DOC_ID, GLOBAL_SETTINGS_COLLECTION,
    PARTICIPANT_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::MatchStore;
use crate::types::Result;

/// Production store backed by MongoDB
#[derive(Clone)]
pub struct MongoMatchStore {
    participants: MongoCollection<ParticipantDoc>,
    outbound: MongoCollection<AssignmentDoc>,
    inbound: MongoCollection<AssignmentDoc>,
    settings: MongoCollection<ForceReceiverDoc>,
}

impl MongoMatchStore {
    /// Open all collections, creating their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            participants: client.collection(PARTICIPANT_COLLECTION).await?,
            outbound: client.collection(ASSIGNMENTS_OUTBOUND).await?,
            inbound: client.collection(ASSIGNMENTS_INBOUND).await?,
            settings: client.collection(GLOBAL_SETTINGS_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl MatchStore for MongoMatchStore {
    async fn participant(&self, uid: &str) -> Result<Option<ParticipantDoc>> {
        self.participants.find_one(doc! { "uid": uid }).await
    }

    async fn receiver_candidates(&self, limit: i64) -> Result<Vec<ParticipantDoc>> {
        self.participants
            .find_many_sorted(
                doc! {
                    "is_activated": true,
                    "is_blocked": false,
                    "suspension": SuspensionState::Active.as_str(),
                },
                Some(doc! { "referral_count": -1 }),
                Some(limit),
            )
            .await
    }

    async fn activated_participants(&self) -> Result<Vec<ParticipantDoc>> {
        self.participants
            .find_many(doc! { "is_activated": true })
            .await
    }

    async fn all_participants(&self) -> Result<Vec<ParticipantDoc>> {
        self.participants.find_many(doc! {}).await
    }

    async fn set_suspension(&self, uid: &str, state: SuspensionState) -> Result<()> {
        self.participants
            .update_one(
                doc! { "uid": uid },
                doc! { "$set": {
                    "suspension": state.as_str(),
                    "metadata.updated_at": bson::DateTime::now(),
                } },
            )
            .await?;
        Ok(())
    }

    async fn set_suspension_if_missing(&self, uid: &str) -> Result<bool> {
        let result = self
            .participants
            .update_one(
                doc! { "uid": uid, "suspension": { "$exists": false } },
                doc! { "$set": {
                    "suspension": SuspensionState::Active.as_str(),
                    "metadata.updated_at": bson::DateTime::now(),
                } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn count_active_inbound(&self, receiver_id: &str) -> Result<u64> {
        self.outbound
            .count(doc! {
                "receiver_id": receiver_id,
                "status": { "$in": ["pending", "confirmed"] },
            })
            .await
    }

    async fn pending_inbound_oldest_first(&self, receiver_id: &str) -> Result<Vec<AssignmentDoc>> {
        self.outbound
            .find_many_sorted(
                doc! { "receiver_id": receiver_id, "status": "pending" },
                Some(doc! { "created_at": 1 }),
                None,
            )
            .await
    }

    async fn outbound_count(&self, sender_uid: &str) -> Result<u64> {
        self.outbound.count(doc! { "sender_uid": sender_uid }).await
    }

    async fn outbound_active_count(&self, sender_uid: &str) -> Result<u64> {
        self.outbound
            .count(doc! {
                "sender_uid": sender_uid,
                "status": { "$in": ["pending", "confirmed"] },
            })
            .await
    }

    async fn outbound_pair_exists(&self, pair_key: &str) -> Result<bool> {
        Ok(self
            .outbound
            .find_one(doc! {
                "pair_key": pair_key,
                "status": { "$in": ["pending", "confirmed"] },
            })
            .await?
            .is_some())
    }

    async fn outbound_receiver_ids(&self, sender_uid: &str) -> Result<Vec<String>> {
        let docs = self
            .outbound
            .find_many(doc! { "sender_uid": sender_uid })
            .await?;
        Ok(docs.into_iter().map(|a| a.receiver_id).collect())
    }

    async fn insert_pair(&self, assignment: AssignmentDoc) -> Result<()> {
        // Two independent writes. If the second fails the pair is
        // half-written; the sweep detects and repairs that on its next run.
        self.outbound.insert_one(assignment.clone()).await?;
        self.inbound.insert_one(assignment).await?;
        Ok(())
    }

    async fn delete_pair(&self, assignment_id: &str) -> Result<()> {
        self.outbound
            .soft_delete(doc! { "_id": assignment_id })
            .await?;
        self.inbound
            .soft_delete(doc! { "_id": assignment_id })
            .await?;
        Ok(())
    }

    async fn force_receiver(&self) -> Result<Option<ForceReceiverDoc>> {
        self.settings
            .find_one(doc! { "_id": FORCE_RECEIVER_DOC_ID })
            .await
    }
}

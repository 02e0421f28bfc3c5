//! Eligibility filter: the candidate pool for a given sender
//!
//! The legacy scripts carried several divergent inline filters (some checked
//! four conditions, some five, some consulted referral counts and some did
//! not). This module replaces them with one explicit, named rule set;
//! [`RuleSet::V1`] implements the union of every gating condition observed,
//! so nothing the old variants excluded can slip through.

use tracing::debug;

use crate::db::schemas::ParticipantDoc;
use crate::store::MatchStore;
use crate::types::Result;

/// Identities that must never be selected as receivers.
///
/// Their historical assignment records stay visible; the exclusion applies
/// only to new receiver selection.
#[derive(Debug, Clone, Default)]
pub struct ReservedIds {
    /// Internal uids of reserved accounts
    pub uids: Vec<String>,
    /// External member ids of reserved accounts
    pub participant_ids: Vec<String>,
}

impl ReservedIds {
    pub fn contains_uid(&self, uid: &str) -> bool {
        self.uids.iter().any(|u| u == uid)
    }

    pub fn contains_participant_id(&self, id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == id)
    }

    /// Whether this participant is a reserved or system identity
    pub fn is_reserved(&self, participant: &ParticipantDoc) -> bool {
        participant.is_system_user
            || self.contains_uid(&participant.uid)
            || self.contains_participant_id(&participant.participant_id)
    }
}

/// Versioned eligibility rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSet {
    /// Union of the legacy variants' conditions: self-exclusion,
    /// duplicate-pair exclusion, system exclusion, activation + block +
    /// suspension gating, referral-count priority with registration-time
    /// tie-break.
    V1,
}

/// Computes the ordered candidate pool for a sender
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    pub reserved: ReservedIds,
    /// Top-N bound pushed into the candidate query
    pub candidate_limit: i64,
    pub rules: RuleSet,
}

impl EligibilityFilter {
    pub fn new(reserved: ReservedIds, candidate_limit: i64) -> Self {
        Self {
            reserved,
            candidate_limit,
            rules: RuleSet::V1,
        }
    }

    /// Ordered candidate receivers for `sender`.
    ///
    /// An empty result is the expected "no eligible receiver" outcome, not
    /// an error. The store query pushes the activation/block/suspension
    /// predicates and referral ordering down; everything else is applied
    /// defensively in memory on the snapshot.
    pub async fn candidates(
        &self,
        store: &dyn MatchStore,
        sender: &ParticipantDoc,
    ) -> Result<Vec<ParticipantDoc>> {
        let already_targeted = store.outbound_receiver_ids(&sender.uid).await?;
        let pool = store.receiver_candidates(self.candidate_limit).await?;

        let mut eligible: Vec<ParticipantDoc> = pool
            .into_iter()
            .filter(|candidate| self.admits(sender, &already_targeted, candidate))
            .collect();

        // Referral count descending, earliest registration wins ties. The
        // sort is stable and total so repeated runs pick the same candidate.
        eligible.sort_by(|a, b| {
            b.referral_count.cmp(&a.referral_count).then_with(|| {
                let a_reg = a.registered_at.map(|d| d.timestamp_millis()).unwrap_or(i64::MAX);
                let b_reg = b.registered_at.map(|d| d.timestamp_millis()).unwrap_or(i64::MAX);
                a_reg.cmp(&b_reg)
            })
        });

        debug!(
            sender = %sender.participant_id,
            candidates = eligible.len(),
            "eligibility pool computed"
        );

        Ok(eligible)
    }

    /// Whether a single candidate passes the rule set for this sender
    pub fn admits(
        &self,
        sender: &ParticipantDoc,
        already_targeted: &[String],
        candidate: &ParticipantDoc,
    ) -> bool {
        match self.rules {
            RuleSet::V1 => {
                candidate.uid != sender.uid
                    && !already_targeted.contains(&candidate.participant_id)
                    && !self.reserved.is_reserved(candidate)
                    && candidate.can_receive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::SuspensionState;
    use crate::store::MemoryStore;
    use bson::DateTime;

    fn participant(uid: &str, pid: &str, referrals: i64) -> ParticipantDoc {
        ParticipantDoc {
            uid: uid.to_string(),
            participant_id: pid.to_string(),
            full_name: format!("Member {}", pid),
            level: "Star".to_string(),
            is_activated: true,
            is_blocked: false,
            suspension: Some(SuspensionState::Active),
            referral_count: referrals,
            registered_at: Some(DateTime::from_millis(1_700_000_000_000)),
            ..Default::default()
        }
    }

    fn filter() -> EligibilityFilter {
        EligibilityFilter::new(
            ReservedIds {
                uids: vec![],
                participant_ids: vec!["HHF000001".to_string()],
            },
            10,
        )
    }

    #[tokio::test]
    async fn test_excludes_self_and_system_accounts() {
        let store = MemoryStore::new();
        let sender = participant("u1", "HHF000100", 0);
        store.insert_participant(sender.clone()).await;

        let mut system = participant("u2", "HHF000001", 50);
        system.is_system_user = false; // reserved by participant id alone
        store.insert_participant(system).await;

        let mut flagged = participant("u3", "HHF000200", 40);
        flagged.is_system_user = true;
        store.insert_participant(flagged).await;

        let normal = participant("u4", "HHF000300", 1);
        store.insert_participant(normal).await;

        let candidates = filter().candidates(&store, &sender).await.unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["HHF000300"]);
    }

    #[tokio::test]
    async fn test_excludes_blocked_held_and_inactive() {
        let store = MemoryStore::new();
        let sender = participant("u1", "HHF000100", 0);
        store.insert_participant(sender.clone()).await;

        let mut blocked = participant("u2", "HHF000201", 9);
        blocked.is_blocked = true;
        store.insert_participant(blocked).await;

        let mut held = participant("u3", "HHF000202", 8);
        held.suspension = Some(SuspensionState::HeldCapacity);
        store.insert_participant(held).await;

        let mut inactive = participant("u4", "HHF000203", 7);
        inactive.is_activated = false;
        store.insert_participant(inactive).await;

        // Suspension never initialized: ineligible until the repair sweep
        let mut uninitialized = participant("u5", "HHF000204", 6);
        uninitialized.suspension = None;
        store.insert_participant(uninitialized).await;

        let candidates = filter().candidates(&store, &sender).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_excludes_already_targeted_receivers() {
        let store = MemoryStore::new();
        let sender = participant("u1", "HHF000100", 0);
        let receiver = participant("u2", "HHF000200", 5);
        store.insert_participant(sender.clone()).await;
        store.insert_participant(receiver.clone()).await;

        let pair = crate::db::schemas::AssignmentDoc::pair(&sender, &receiver);
        store.seed_pair(pair).await;

        let candidates = filter().candidates(&store, &sender).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_ordering_referrals_desc_then_registration_asc() {
        let store = MemoryStore::new();
        let sender = participant("u1", "HHF000100", 0);
        store.insert_participant(sender.clone()).await;

        let mut early = participant("u2", "HHF000201", 5);
        early.registered_at = Some(DateTime::from_millis(1_000));
        store.insert_participant(early).await;

        let mut late = participant("u3", "HHF000202", 5);
        late.registered_at = Some(DateTime::from_millis(2_000));
        store.insert_participant(late).await;

        let top = participant("u4", "HHF000203", 9);
        store.insert_participant(top).await;

        let candidates = filter().candidates(&store, &sender).await.unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["HHF000203", "HHF000201", "HHF000202"]);
    }
}

//! Help-assignment matching engine
//!
//! Control flow for one assignment attempt:
//!
//! ```text
//! activation trigger / sweep item
//!     -> override snapshot read (selector.rs)
//!     -> eligibility filter (eligibility.rs)
//!     -> assignment writer (writer.rs)
//!     -> capacity guard (guard.rs)
//!          -> excess cleanup (sweep.rs)
//!               -> displaced senders re-queued through the trigger
//! ```
//!
//! All writes are individual document operations with no transaction; the
//! reconciliation sweep is the compensating mechanism for partial state.

pub mod activation;
pub mod eligibility;
pub mod guard;
pub mod levels;
pub mod selector;
pub mod sweep;
pub mod writer;

use std::sync::Arc;

use crate::store::MatchStore;

pub use activation::{AssignmentOutcome, SkipReason};
pub use eligibility::{EligibilityFilter, ReservedIds, RuleSet};
pub use levels::{capacity_for, MAX_OUTSTANDING_SENDS};
pub use selector::OverrideSnapshot;
pub use sweep::{CleanupStats, RepairSummary, SkippedItem, SweepSummary};

/// Engine tunables, normally populated from CLI args
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Top-N bound for the candidate query
    pub candidate_limit: i64,
    /// Sender-side outstanding-assignment cap
    pub max_outstanding_sends: u64,
    /// Identities excluded from receiver selection
    pub reserved: ReservedIds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 10,
            max_outstanding_sends: levels::MAX_OUTSTANDING_SENDS,
            reserved: ReservedIds {
                uids: Vec::new(),
                participant_ids: vec!["HHF000001".to_string(), "HHF999999".to_string()],
            },
        }
    }
}

/// The matching engine. Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn MatchStore>,
    filter: EligibilityFilter,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn MatchStore>, config: EngineConfig) -> Self {
        let filter = EligibilityFilter::new(config.reserved.clone(), config.candidate_limit);
        Self {
            store,
            filter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }
}

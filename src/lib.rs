//! Helpmatch - help-assignment matching engine
//!
//! Pairs senders with receivers in a peer-to-peer payment circle, enforcing
//! per-level capacity limits, honoring operator-forced assignment, and
//! repairing drift caused by concurrent, non-transactional writes against
//! the shared document store.
//!
//! ## Components
//!
//! - **Engine**: eligibility filtering, receiver selection, paired
//!   assignment writes, post-write capacity enforcement
//! - **Sweep**: idempotent backfill, excess cleanup, and field-repair
//!   batch operations
//! - **Store**: the document-store contract with MongoDB and in-memory
//!   implementations

pub mod config;
pub mod db;
pub mod engine;
pub mod store;
pub mod types;

pub use config::{Args, Command};
pub use engine::{AssignmentOutcome, Engine, EngineConfig, SkipReason};
pub use types::{HelpmatchError, Result};

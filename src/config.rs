//! Configuration for Helpmatch
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};

use crate::engine::{EngineConfig, ReservedIds, MAX_OUTSTANDING_SENDS};

/// Helpmatch - help-assignment matching engine
#[derive(Parser, Debug, Clone)]
#[command(name = "helpmatch")]
#[command(about = "Pairs senders with receivers in a peer-to-peer payment circle")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "helpmatch")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Top-N bound for the receiver candidate query
    #[arg(long, env = "CANDIDATE_LIMIT", default_value = "10")]
    pub candidate_limit: i64,

    /// Fixed cap on a sender's outstanding assignments
    #[arg(long, env = "MAX_OUTSTANDING_SENDS", default_value_t = MAX_OUTSTANDING_SENDS)]
    pub max_outstanding_sends: u64,

    /// Comma-separated external member ids never selected as receivers
    #[arg(
        long,
        env = "RESERVED_PARTICIPANT_IDS",
        default_value = "HHF000001,HHF999999"
    )]
    pub reserved_participant_ids: String,

    /// Comma-separated internal uids never selected as receivers
    #[arg(long, env = "RESERVED_UIDS", default_value = "")]
    pub reserved_uids: String,

    #[command(subcommand)]
    pub command: Command,
}

/// One-shot batch operations
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one assignment attempt for a single sender
    AssignOne {
        /// Internal uid of the sender
        #[arg(long)]
        uid: String,
    },
    /// Backfill assignments for all activated, unsuspended senders
    AssignActive,
    /// Backfill assignments for every activated sender, suspended or not
    AssignAll,
    /// Initialize missing suspension fields (one-time migration)
    FixSuspensionFields,
}

impl Args {
    fn split_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Engine tunables derived from the parsed arguments
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            candidate_limit: self.candidate_limit,
            max_outstanding_sends: self.max_outstanding_sends,
            reserved: ReservedIds {
                uids: Self::split_list(&self.reserved_uids),
                participant_ids: Self::split_list(&self.reserved_participant_ids),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.candidate_limit <= 0 {
            return Err("CANDIDATE_LIMIT must be positive".to_string());
        }
        if self.max_outstanding_sends == 0 {
            return Err("MAX_OUTSTANDING_SENDS must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_id_lists_are_split_and_trimmed() {
        let args = Args::parse_from([
            "helpmatch",
            "--reserved-participant-ids",
            "HHF000001, HHF999999,",
            "--reserved-uids",
            "abc",
            "assign-active",
        ]);
        let config = args.engine_config();
        assert_eq!(
            config.reserved.participant_ids,
            vec!["HHF000001".to_string(), "HHF999999".to_string()]
        );
        assert_eq!(config.reserved.uids, vec!["abc".to_string()]);
    }

    #[test]
    fn test_validate_rejects_nonpositive_limits() {
        let args = Args::parse_from(["helpmatch", "--candidate-limit", "0", "assign-active"]);
        assert!(args.validate().is_err());
    }
}

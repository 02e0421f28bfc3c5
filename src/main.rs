//! Helpmatch - help-assignment matching engine CLI

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpmatch::{
    config::{Args, Command},
    db::MongoClient,
    engine::{Engine, SweepSummary},
    store::MongoMatchStore,
    AssignmentOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("helpmatch={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Helpmatch - assignment engine");
    info!(
        "  build {} ({})",
        env!("GIT_COMMIT_SHORT"),
        env!("BUILD_TIMESTAMP")
    );
    info!("======================================");
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("Candidate limit: {}", args.candidate_limit);
    info!("======================================");

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let store = match MongoMatchStore::new(&mongo).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open collections: {}", e);
            std::process::exit(1);
        }
    };

    let engine = Engine::new(store, args.engine_config());

    // Batches exit 0 on completion regardless of per-item skips; only an
    // unhandled top-level error is nonzero.
    match &args.command {
        Command::AssignOne { uid } => {
            let outcome = engine.assign_on_activation(uid).await?;
            match outcome {
                AssignmentOutcome::Assigned {
                    assignment_id,
                    receiver_id,
                } => {
                    info!(
                        assignment = %assignment_id,
                        receiver = %receiver_id,
                        "assignment created"
                    );
                }
                AssignmentOutcome::Skipped(reason) => {
                    info!(%reason, "no assignment made");
                }
            }
        }
        Command::AssignActive => {
            let summary = engine.backfill_active().await?;
            report(&summary);
        }
        Command::AssignAll => {
            let summary = engine.backfill_all().await?;
            report(&summary);
        }
        Command::FixSuspensionFields => {
            let summary = engine.repair_missing_suspension().await?;
            info!("Repair complete: {}", summary);
        }
    }

    Ok(())
}

/// Final sweep report, printed even when some items failed
fn report(summary: &SweepSummary) {
    info!("Sweep complete: {}", summary);
    for item in &summary.skipped_items {
        info!(
            participant = %item.participant_id,
            reason = %item.reason,
            "skipped"
        );
    }
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::dag::Pipeline;
use crate::fs::RealFileSystem;
use crate::orchestrator::{DevOptions, Orchestrator, project_root_for};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (optional file, defaults otherwise)
/// - the task registry and pipeline for the requested target
/// - the preview server and file watcher for `serve` / `watch`
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_or_default(&config_path)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let project_root = project_root_for(&config_path);
    debug!(root = ?project_root, target = %args.target, "resolved project");
    let orchestrator = Orchestrator::new(cfg, &project_root, Arc::new(RealFileSystem))?;

    if args.dry_run {
        print!("{}", orchestrator.dry_run(args.target)?);
        return Ok(());
    }

    if args.target.is_watching() {
        orchestrator
            .serve_until(DevOptions::for_target(args.target), ctrl_c())
            .await?;
    } else {
        orchestrator
            .run_once(&Pipeline::for_target(args.target))
            .await?;
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

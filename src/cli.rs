// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Target;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Compile, minify and copy front-end assets, with a live-reload preview.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run: `build`, `serve`, `watch`, or a single task
    /// (html, css, mincss, js, minjs, copyimages, minimages, copy, clean).
    #[arg(value_name = "TASK", default_value = "build")]
    pub target: Target,

    /// Path to the config file (TOML). A missing file means default layout.
    ///
    /// Default: `Assetpipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate config, print the task graph and planned outputs, but don't
    /// touch any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Preview server port, overriding `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

//! CLI command definitions for the `deckhand` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod serve;
pub mod services;
pub mod sign;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use deckhand_infra::config::ConfigOverrides;

/// Roll Docker Swarm services to freshly published package images.
#[derive(Parser)]
#[command(name = "deckhand", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, short = 'c', global = true, env = "DECKHAND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Receive package webhooks and update matching services.
    Serve {
        /// Listen address (default 0.0.0.0, or HOST).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default 3000, or PORT).
        #[arg(long, short)]
        port: Option<u16>,

        /// Docker Engine endpoint (default unix:///var/run/docker.sock, or DOCKER_HOST).
        #[arg(long)]
        docker_host: Option<String>,

        /// Apply updates to an in-memory orchestrator instead of Docker.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which services track which package images.
    #[command(alias = "ls")]
    Services {
        /// Output machine-readable JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the x-hub-signature-256 value for a payload.
    Sign {
        /// Payload file, or `-` for stdin.
        #[arg(default_value = "-")]
        file: PathBuf,

        /// Output the header name and value as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Command-line values that override file and environment configuration.
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            config_path: self.config.clone(),
            ..ConfigOverrides::default()
        };
        if let Commands::Serve {
            host,
            port,
            docker_host,
            ..
        } = &self.command
        {
            overrides.host = host.clone();
            overrides.port = *port;
            overrides.docker_host = docker_host.clone();
        }
        overrides
    }
}

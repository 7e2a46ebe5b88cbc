//! Command-line interface parsing for iotdash
//!
//! This module handles parsing of CLI arguments using clap and merging the
//! global flags over the values read from the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// `--interval 0` would spin the watch loop
    #[error("Invalid interval: must be at least 1 second")]
    ZeroInterval,

    /// `--base-url` was given an empty value
    #[error("Invalid base URL: value is empty")]
    EmptyBaseUrl,
}

/// iotdash - cached dashboard summaries from an IoT console backend
#[derive(Parser, Debug)]
#[command(name = "iotdash")]
#[command(about = "Cached dashboard summaries from an IoT console backend")]
#[command(version)]
pub struct Cli {
    /// Read settings from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true, env = "IOTDASH_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Bearer token, overriding the config file
    #[arg(long, global = true, env = "IOTDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do once settings are resolved
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the dashboard counters once (default)
    Summary {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-read the dashboard periodically until interrupted
    Watch {
        /// Seconds between reads, overriding the config file
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Print the cache TTL table
    Policy,
    /// Warm the cache, apply named actions and show which keys went stale
    ///
    /// Examples:
    ///   iotdash action cluster_created
    ///   iotdash action device_deleted acl_updated
    Action {
        /// Action names such as cluster_created or mqtt_credentials_updated
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
}

impl Cli {
    /// The command to run, defaulting to a plain summary
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Summary { json: false })
    }

    /// Applies global flags and command options over file settings
    pub fn apply_to(&self, mut config: Config) -> Result<Config, CliError> {
        if let Some(base_url) = &self.base_url {
            if base_url.trim().is_empty() {
                return Err(CliError::EmptyBaseUrl);
            }
            config.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(Command::Watch {
            interval: Some(secs),
        }) = &self.command
        {
            if *secs == 0 {
                return Err(CliError::ZeroInterval);
            }
            config.watch_interval_secs = *secs;
        }
        Ok(config)
    }
}

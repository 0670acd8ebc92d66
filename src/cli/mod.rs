//! Command-line interface definitions.

pub mod migrate;
pub mod serve;
pub mod session;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::infrastructure::config::logging::LogFormat;
use crate::infrastructure::config::settings::Config;

/// Rapport - friend relationships, groups and sessions for a messaging platform.
#[derive(Parser, Debug)]
#[command(name = "rapport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the database, start the repair worker and run until ctrl-c
    Serve(ServeArgs),

    /// Apply pending database migrations and exit
    Migrate(ConfigPathArg),

    /// Print the session identifier for a conversation
    SessionId(SessionIdArgs),
}

/// Shared argument for commands that only need a config path.
#[derive(Args, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigPathArg {
    /// Load the configured file, or the defaults plus environment overrides.
    pub fn load(&self) -> Result<Config> {
        load_config(self.config.as_deref())
    }
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

impl ServeArgs {
    /// Fold command-line overrides into `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }
    }
}

/// Arguments for the `session-id` subcommand.
#[derive(Args, Debug)]
pub struct SessionIdArgs {
    /// Conversation kind code (0 single, 1 group, 2 broadcast, 3 channel)
    #[arg(allow_negative_numbers = true)]
    pub kind: i32,
    /// First participant
    #[arg(allow_negative_numbers = true)]
    pub a: i64,
    /// Second participant (the group for group chats)
    #[arg(allow_negative_numbers = true)]
    pub b: i64,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let mut config = Config::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use procdeck_core::{DeckConfig, StderrMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "procdeck",
    version,
    about = "Terminal menu for starting, stopping and talking to worker processes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub menu: MenuArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host one worker entry point over stdin/stdout
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Name of the entry point to run
    pub entry: String,
}

#[derive(Args, Debug, Default)]
pub struct MenuArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Refresh ticks per second
    #[arg(long, value_name = "N")]
    pub tick_rate: Option<u32>,

    /// Received items kept per worker
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,

    /// Write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Let worker stderr through to the terminal
    #[arg(long)]
    pub show_worker_stderr: bool,
}

impl MenuArgs {
    /// Merge the config file (if any) with command line overrides
    pub fn resolve(&self) -> anyhow::Result<DeckConfig> {
        let mut config = match &self.config {
            Some(path) => DeckConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => DeckConfig::default(),
        };

        if let Some(rate) = self.tick_rate {
            config.ticks_per_second = rate;
        }
        if let Some(capacity) = self.capacity {
            config.history_capacity = capacity;
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
        if self.show_worker_stderr {
            config.worker_stderr = StderrMode::Inherit;
        }

        config.validate().context("invalid settings")?;
        Ok(config)
    }
}

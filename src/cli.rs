use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logs-dashboard", version, about = "Logs Dashboard API")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the API server (default)
    Serve,

    /// Populate the database with sample log entries
    Seed {
        /// Number of entries to create
        #[arg(short = 'n', long, default_value = "500")]
        count: u32,

        /// Spread timestamps over this many days back from now
        #[arg(short, long, default_value = "30")]
        days_back: i64,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// The selected command, defaulting to `serve`
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    APP_NAME_LOWER, ENV_CHUNK_SIZE, ENV_CONFIG, ENV_CONNECTION, ENV_DB, ENV_QUEUE,
};

#[derive(Parser)]
#[command(name = APP_NAME_LOWER)]
#[command(version, about = "Filterable CSV report export worker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Export record database path
    #[arg(long, global = true, env = ENV_DB)]
    pub db: Option<PathBuf>,

    /// Queue export jobs are pushed onto
    #[arg(long, global = true, env = ENV_QUEUE)]
    pub queue: Option<String>,

    /// Queue connection name
    #[arg(long, global = true, env = ENV_CONNECTION)]
    pub connection: Option<String>,

    /// Rows per batch in chunked mode
    #[arg(long, global = true, env = ENV_CHUNK_SIZE)]
    pub chunk_size: Option<usize>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Re-queue dispatched exports and process the queue (default command)
    Work {
        /// Keep waiting for new jobs instead of exiting once the queue is empty
        #[arg(long)]
        watch: bool,
    },
    /// Print an export record as JSON
    Status {
        /// Export record id
        id: i64,
    },
    /// Retry a failed export as a new record and process it
    Retry {
        /// Id of the failed export record
        id: i64,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub queue: Option<String>,
    pub connection: Option<String>,
    pub chunk_size: Option<usize>,
}

impl Cli {
    fn into_parts(self) -> (CliConfig, Option<Commands>) {
        let config = CliConfig {
            config: self.config,
            db: self.db,
            queue: self.queue,
            connection: self.connection,
            chunk_size: self.chunk_size,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    Cli::parse().into_parts()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> (CliConfig, Option<Commands>) {
        Cli::try_parse_from(args).unwrap().into_parts()
    }

    #[test]
    fn test_no_command() {
        let (config, command) = parse_from(&["reportable"]);
        assert!(command.is_none());
        assert!(config.config.is_none());
    }

    #[test]
    fn test_work_with_global_flags() {
        let (config, command) =
            parse_from(&["reportable", "work", "--watch", "--queue", "exports", "--chunk-size", "50"]);
        assert_eq!(command, Some(Commands::Work { watch: true }));
        assert_eq!(config.queue.as_deref(), Some("exports"));
        assert_eq!(config.chunk_size, Some(50));
    }

    #[test]
    fn test_status_and_retry() {
        let (_, command) = parse_from(&["reportable", "status", "7"]);
        assert_eq!(command, Some(Commands::Status { id: 7 }));
        let (_, command) = parse_from(&["reportable", "--db", "x.db", "retry", "3"]);
        assert_eq!(command, Some(Commands::Retry { id: 3 }));
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!(Cli::try_parse_from(["reportable", "status", "abc"]).is_err());
    }
}

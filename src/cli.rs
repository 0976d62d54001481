use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::Phase;
use crate::config::ConfigOverrides;
use crate::sql::{Dedup, Dialect};

#[derive(Parser, Debug)]
#[command(name = "songplay-dwh")]
#[command(version, about = "Stage song-play logs and build a star schema")]
pub struct Cli {
    /// Config file (TOML with [storage], [access] and [cluster] sections)
    #[arg(short, long, global = true, env = "SONGPLAY_DWH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "songplay_dwh=debug"
    #[arg(long, global = true, default_value = "info", env = "SONGPLAY_DWH_LOG")]
    pub log_level: String,

    /// Show a full-screen progress view instead of log lines
    #[arg(long, global = true)]
    pub tui: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-key config overrides
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Event log source path
    #[arg(long, global = true, env = "DWH_LOG_DATA")]
    pub log_data: Option<String>,

    /// JSONPaths document for the event log
    #[arg(long, global = true, env = "DWH_LOG_JSONPATH")]
    pub log_jsonpath: Option<String>,

    /// Song catalog source path
    #[arg(long, global = true, env = "DWH_SONG_DATA")]
    pub song_data: Option<String>,

    /// Role the warehouse assumes for bulk loads
    #[arg(long, global = true, env = "DWH_IAM_ROLE")]
    pub iam_role: Option<String>,

    /// Region of the source data
    #[arg(long, global = true, env = "DWH_REGION")]
    pub region: Option<String>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            log_data: args.log_data,
            log_jsonpath: args.log_jsonpath,
            song_data: args.song_data,
            iam_role: args.iam_role,
            region: args.region,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the catalog's SQL statements
    Sql {
        /// Target engine
        #[arg(short, long, default_value_t = Dialect::Redshift)]
        dialect: Dialect,

        /// Only print one list (drop, create, copy, insert)
        #[arg(short, long)]
        phase: Option<Phase>,

        /// Dimension dedup rule (by-key, literal)
        #[arg(long, default_value_t = Dedup::ByKey)]
        dedup: Dedup,
    },

    /// Drop and recreate all tables in a local SQLite database
    CreateTables {
        /// SQLite database path
        db: PathBuf,
    },

    /// Load staging tables and build the star schema in a local SQLite database
    Etl {
        /// SQLite database path
        db: PathBuf,

        /// Dimension dedup rule (by-key, literal)
        #[arg(long, default_value_t = Dedup::ByKey)]
        dedup: Dedup,
    },

    /// Drop, create, load and transform in one go
    Run {
        /// SQLite database path
        db: PathBuf,

        /// Dimension dedup rule (by-key, literal)
        #[arg(long, default_value_t = Dedup::ByKey)]
        dedup: Dedup,
    },

    /// List all tables with their role and physical hints
    ListTables {
        /// Show the columns of one table instead
        table: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

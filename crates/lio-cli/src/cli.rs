use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use lio_algo::ZeroColumnPolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Analysis configuration file (TOML); flags override its values
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve intermediate demand for every sector of a region
    Solve {
        #[command(flatten)]
        input: CoefficientsInput,

        /// Region code receiving unit final demand
        #[arg(long)]
        region: Option<String>,

        /// Worker threads for column slices (0 = auto)
        #[arg(long)]
        threads: Option<usize>,

        /// Columns per slice (0 = split evenly)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Largest acceptable condition estimate of (I - A)
        #[arg(long)]
        condition_threshold: Option<f64>,

        /// Abort once this many seconds have passed
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Output triplet CSV (a .meta.json sidecar is written next to it)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
    },
    /// Remove inactive and household sectors from solved results
    Filter {
        #[command(flatten)]
        input: CoefficientsInput,

        /// Stored results written by `lio solve`
        #[arg(long, value_hint = ValueHint::FilePath)]
        results: PathBuf,

        /// What to do with columns left entirely zero (report, warn, fail)
        #[arg(long)]
        zero_column_policy: Option<ZeroColumnPolicy>,

        /// Substring marking household sectors
        #[arg(long)]
        household_marker: Option<String>,

        /// Keep household sectors
        #[arg(long)]
        keep_households: bool,

        /// Keep structurally inactive sectors
        #[arg(long)]
        keep_inactive: bool,

        /// Output triplet CSV for the filtered results
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,

        /// Write the zero-column report as JSON
        #[arg(long, value_hint = ValueHint::FilePath)]
        report: Option<PathBuf>,
    },
    /// Summarize a coefficient matrix
    Inspect {
        #[command(flatten)]
        input: CoefficientsInput,

        /// Output format
        #[arg(long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Where the coefficient matrix comes from.
#[derive(Args, Debug, Clone)]
pub struct CoefficientsInput {
    /// Coefficient CSV table (defaults to the configured dataset)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub table: Option<PathBuf>,

    /// Coefficient matrix stored as triplet CSV + sidecar
    #[arg(long, conflicts_with = "table", value_hint = ValueHint::FilePath)]
    pub stored: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination path
        #[arg(default_value = "lio.toml", value_hint = ValueHint::FilePath)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_parse_filter_policy() {
        let cli = Cli::try_parse_from([
            "lio",
            "filter",
            "--stored",
            "a.csv",
            "--results",
            "x.csv",
            "--zero-column-policy",
            "fail",
            "-o",
            "y.csv",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Filter {
                zero_column_policy, ..
            }) => assert_eq!(zero_column_policy, Some(ZeroColumnPolicy::Fail)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_table_and_stored_conflict() {
        let parsed = Cli::try_parse_from([
            "lio", "inspect", "--table", "a.csv", "--stored", "b.csv",
        ]);
        assert!(parsed.is_err());
    }
}

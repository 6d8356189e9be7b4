use clap::Parser;
use lio_cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::filter::FilterOverrides;
use commands::solve::SolveOverrides;
use commands::util::load_config;
use commands::{config, filter, inspect, solve};

fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        info!("No subcommand provided. Use `lio --help` for more information.");
        return Ok(());
    };
    let analysis = load_config(cli.config.as_deref())?;

    match command {
        Commands::Solve {
            input,
            region,
            threads,
            chunk_size,
            condition_threshold,
            deadline_secs,
            out,
        } => {
            let overrides = SolveOverrides {
                region: region.clone(),
                threads: *threads,
                chunk_size: *chunk_size,
                condition_threshold: *condition_threshold,
                deadline_secs: *deadline_secs,
            };
            solve::handle(analysis, input, &overrides, out)
        }
        Commands::Filter {
            input,
            results,
            zero_column_policy,
            household_marker,
            keep_households,
            keep_inactive,
            out,
            report,
        } => {
            let overrides = FilterOverrides {
                zero_column_policy: *zero_column_policy,
                household_marker: household_marker.clone(),
                keep_households: *keep_households,
                keep_inactive: *keep_inactive,
            };
            filter::handle(analysis, input, results, &overrides, out, report.as_deref())
        }
        Commands::Inspect { input, format } => inspect::handle(analysis, input, *format),
        Commands::Config { command } => config::handle(analysis, command),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&cli) {
        error!("lio failed: {:?}", e);
        std::process::exit(1);
    }
}

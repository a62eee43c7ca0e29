//! Content tracker binary entrypoint.
//! Loads config, wires the tracker and dispatches CLI subcommands.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use content_tracker::cli::{Cli, Command, RecordsCommand, SourcesCommand};
use content_tracker::config::TrackerConfig;
use content_tracker::error::CycleError;
use content_tracker::service::TrackerService;
use content_tracker::telemetry::init_tracing;
use content_tracker::track::scheduler::{run_until, SchedulerCfg};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "content-tracker failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => TrackerConfig::load_from_file(path)?,
        None => TrackerConfig::load_default()?,
    };
    let service = TrackerService::from_config(&cfg).context("initializing tracker")?;

    match cli.command {
        Command::Run { no_initial_check } => {
            let mut sched = SchedulerCfg::from_config(&cfg);
            if no_initial_check {
                sched.run_on_start = false;
            }
            info!(
                analyzer = cfg.analyzer.provider.as_str(),
                sources = cfg.sources.len(),
                "starting scheduler"
            );
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "ctrl-c handler failed");
                }
            };
            run_until(service.tracker().clone(), sched, shutdown).await;
        }
        Command::CheckNow => match service.check_now().await {
            Ok(report) => {
                print!("{}", report.render());
                if let Some(path) = &report.report_path {
                    println!("\nReport written to {}", path.display());
                }
            }
            Err(CycleError::Busy) => println!("A check cycle is already running."),
            Err(e) => return Err(e.into()),
        },
        Command::Sources(SourcesCommand::List(filter)) => {
            for source in service.list_sources(filter.platform)? {
                println!("{}\t{}", source.platform, source.handle);
            }
        }
        Command::Sources(SourcesCommand::Set { platform, handles }) => {
            let written = service.update_source_list(platform, handles.as_slice())?;
            println!("{} {platform} sources saved", written.len());
        }
        Command::Records(RecordsCommand::List { filter, limit }) => {
            for r in service.list_records(filter.platform, limit)? {
                println!(
                    "{}\t{}\t{} bytes\t{}",
                    r.modified.format("%Y-%m-%d %H:%M:%S"),
                    r.platform.map(|p| p.as_str()).unwrap_or("-"),
                    r.size_bytes,
                    r.filename
                );
            }
        }
        Command::Records(RecordsCommand::Get { id }) => {
            print!("{}", service.get_record(&id)?);
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&service.status())?);
        }
    }

    Ok(())
}

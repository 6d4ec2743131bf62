use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

mod analyzer;
mod api;
mod classifier;
mod cli;
mod convert;
mod error;
mod follow;
mod logging;
mod markers;
mod models;
mod parser;
mod recorder;
mod render;
mod validate;

use analyzer::{Analyzer, FollowUpdate, RunSummary, SessionReport};
use api::SharedReport;
use cli::{Cli, LogSource};
use error::AnalyzerError;
use follow::LogFollower;
use markers::MarkerTable;
use models::RunOutcome;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ptanalyzer failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AnalyzerError> {
    // 1. Marker vocabulary
    let markers = match &cli.markers {
        Some(path) => MarkerTable::load(path)?,
        None => MarkerTable::default(),
    };

    // 2. Resolve the log
    let local_app_data = std::env::var_os("LOCALAPPDATA").map(PathBuf::from);
    let source = cli.log_source(local_app_data.as_deref())?;
    let source_name = source.path.display().to_string();

    // 3. Report shared with the HTTP server, if any
    let report: SharedReport =
        Arc::new(Mutex::new(SessionReport::new(&source_name, Vec::new())));
    let server = cli.serve.map(|addr| start_server(addr, report.clone(), cli.open));

    // 4. Analyse
    if source.follow {
        follow_log(cli, &source, markers, &report)?;
    } else {
        analyze_log(cli, &source, markers, &report)?;
    }

    // 5. Keep serving the final report until Ctrl-C
    if let Some(handle) = server {
        info!("Analysis done; report stays available until Ctrl-C");
        match handle.join() {
            Ok(result) => result?,
            Err(_) => error!("Report server thread panicked"),
        }
    }
    Ok(())
}

fn analyze_log(
    cli: &Cli,
    source: &LogSource,
    markers: MarkerTable,
    report: &SharedReport,
) -> Result<(), AnalyzerError> {
    let lines = parser::read_log_file(&source.path)?;
    let outcomes = Analyzer::new(markers).analyze_log(lines);
    let session = SessionReport::new(source.path.display().to_string(), outcomes);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print!("{}", render::render_report(&session));
    }

    publish(report, session);
    Ok(())
}

fn follow_log(
    cli: &Cli,
    source: &LogSource,
    markers: MarkerTable,
    report: &SharedReport,
) -> Result<(), AnalyzerError> {
    let follower = LogFollower::open(&source.path, Duration::from_millis(cli.poll_ms))?;
    let source_name = source.path.display().to_string();
    let mut analyzer = Analyzer::new(markers);

    analyzer.follow_log(follower, |update| match update {
        // JSON output carries outcomes only
        FollowUpdate::FirstShield { run_nr, shield } => {
            if !cli.json {
                print!("{}", render::render_first_shield(run_nr, shield));
            }
        }
        FollowUpdate::Outcome { latest, outcomes } => {
            if cli.json {
                match serde_json::to_string(latest) {
                    Ok(line) => println!("{line}"),
                    Err(e) => {
                        warn!(error = %e, run_nr = latest.run_nr(), "Could not encode outcome")
                    }
                }
            } else {
                print!("{}", render::render_outcome(latest));
                let summary = RunSummary::from_outcomes(outcomes);
                if let (RunOutcome::Completed(_), Some(summary)) = (latest, summary) {
                    println!("{}", render::render_summary(&summary));
                }
            }
            publish(report, SessionReport::new(source_name.clone(), outcomes.to_vec()));
        }
    });

    // Only reached if the follower ever stops producing lines.
    Ok(())
}

fn publish(report: &SharedReport, session: SessionReport) {
    match report.lock() {
        Ok(mut shared) => *shared = session,
        Err(_) => warn!("Report lock poisoned; served report is stale"),
    }
}

/// Start the report server on its own thread with its own tokio runtime
fn start_server(
    addr: SocketAddr,
    report: SharedReport,
    open_browser: bool,
) -> JoinHandle<Result<(), AnalyzerError>> {
    let handle = std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().map_err(AnalyzerError::Server)?;
        rt.block_on(api::serve(addr, report))
    });

    if open_browser {
        // Brief pause so the server is listening before the browser asks
        std::thread::sleep(Duration::from_millis(600));
        if let Err(e) = open::that(format!("http://{addr}/api/report")) {
            warn!(error = %e, "Could not open the browser");
        }
    }
    handle
}

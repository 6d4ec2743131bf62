use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::AnalyzerError;

/// Split times for Profit-Taker runs, read from the Warframe EE.log
#[derive(Parser, Debug)]
#[command(name = "ptanalyzer", author, version, about)]
pub struct Cli {
    /// Log to analyse. Defaults to following %LOCALAPPDATA%/Warframe/EE.log
    pub log: Option<PathBuf>,

    /// Keep reading the log as the game writes it
    #[arg(short, long)]
    pub follow: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also serve the report over HTTP, e.g. 127.0.0.1:3000
    #[arg(long, value_name = "ADDR")]
    pub serve: Option<SocketAddr>,

    /// Open the served report in the browser
    #[arg(long, requires = "serve")]
    pub open: bool,

    /// YAML file overriding log markers
    #[arg(long, value_name = "PATH", env = "PTANALYZER_MARKERS")]
    pub markers: Option<PathBuf>,

    /// Delay between checks for new lines in follow mode
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub poll_ms: u64,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Which log to read and whether to keep following it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub follow: bool,
}

impl Cli {
    /// Without an explicit log the game's own log is followed live.
    pub fn log_source(&self, local_app_data: Option<&Path>) -> Result<LogSource, AnalyzerError> {
        match &self.log {
            Some(path) => Ok(LogSource {
                path: path.clone(),
                follow: self.follow,
            }),
            None => {
                let base = local_app_data.ok_or(AnalyzerError::NoDefaultLog)?;
                Ok(LogSource {
                    path: base.join("Warframe").join("EE.log"),
                    follow: true,
                })
            }
        }
    }
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_feed_adapter::CsvSampleFeed;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_executor::PaperExecutor;
use crate::adapters::tracing_sink::TracingSnapshotSink;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::validate_engine_config;
use crate::domain::engine::TradingEngine;
use crate::domain::error::EngineError;
use crate::domain::session::{run_session, SessionOptions, StopSignal};

#[derive(Parser, Debug)]
#[command(name = "adaptrader", about = "Adaptive single-instrument trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV quote file through the engine with a paper executor
    Replay {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: PathBuf,
        /// Override [engine] instrument
        #[arg(long)]
        instrument: Option<String>,
        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Print the final risk report
        #[arg(long)]
        risk_report: bool,
    },
    /// Validate an engine configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Replay {
            config,
            data,
            instrument,
            max_ticks,
            risk_report,
        } => run_replay(config.as_ref(), &data, instrument, max_ticks, risk_report),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, EngineError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn run_replay(
    config_path: Option<&PathBuf>,
    data_path: &PathBuf,
    instrument: Option<String>,
    max_ticks: Option<u64>,
    risk_report: bool,
) -> Result<(), EngineError> {
    let adapter = load_config(config_path)?;
    let mut config = EngineConfig::from_port(&adapter)?;
    if let Some(instrument) = instrument {
        config.instrument = instrument;
    }
    let mut options = SessionOptions::from_port(&adapter)?;
    if max_ticks.is_some() {
        options.max_ticks = max_ticks;
    }
    let mut executor = PaperExecutor::from_port(&adapter)?;

    let mut engine = TradingEngine::new(config)?;
    eprintln!("Replaying {} for {}", data_path.display(), engine.instrument());
    let mut feed = CsvSampleFeed::from_path(data_path)?;
    let mut sink = TracingSnapshotSink::new();
    let stop = StopSignal::new();

    let report = run_session(&mut engine, &mut feed, &mut executor, &mut sink, &stop, &options)?;
    eprintln!("\n{report}");
    if risk_report {
        eprintln!("\n{}", engine.metrics());
    }
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> Result<(), EngineError> {
    let adapter = load_config(Some(config_path))?;
    let config = EngineConfig::from_port(&adapter)?;
    validate_engine_config(&config)?;
    SessionOptions::from_port(&adapter)?;
    PaperExecutor::from_port(&adapter)?;
    eprintln!("Config validated successfully");
    Ok(())
}

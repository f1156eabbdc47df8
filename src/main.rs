// src/main.rs
use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use neuromood::drivers::{ErrorKind, PipelineError, SampleSource, SyntheticSource};
use neuromood::recorder::ResultRecorder;
use neuromood::replay::CsvReplaySource;
use neuromood::{PipelineConfig, ResultRecord, StreamDriver};

mod cli;

use cli::{Cli, Command};

const EXIT_FAILURE: i32 = 1;
const EXIT_CONFIG: i32 = 2;

/// One stdout line: the record, plus spectrum peaks when `--peaks` is set.
#[derive(Serialize)]
struct OutputLine<'a> {
    #[serde(flatten)]
    record: &'a ResultRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    dominant_hz: Option<BTreeMap<String, f64>>,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<PipelineError>().map(PipelineError::kind) {
                Some(ErrorKind::Configuration) => EXIT_CONFIG,
                _ => EXIT_FAILURE,
            }
        }
    };
    std::process::exit(exit_code);
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::preset(&cli.preset)
            .ok_or_else(|| anyhow!("unknown preset {}", cli.preset))?,
    };
    if cli.delay_ms.is_some() {
        config.inter_sample_delay_ms = cli.delay_ms;
    }
    if cli.parallel {
        config.parallel = true;
    }
    config.validate()?;
    Ok(config)
}

fn open_source(command: &Command, config: &PipelineConfig) -> Result<Box<dyn SampleSource>> {
    Ok(match command {
        Command::Replay(args) => Box::new(CsvReplaySource::open(&args.file, &config.channels)?),
        Command::Simulate(args) => {
            if !(args.seconds >= 0.0 && args.seconds.is_finite()) {
                return Err(anyhow!("--seconds must be a non-negative number"));
            }
            let count = (args.seconds * config.sampling_rate_hz).round() as usize;
            info!("simulating {count} sample-sets (seed {})", args.seed);
            Box::new(SyntheticSource::new(
                config.channels.clone(),
                config.sampling_rate_hz,
                count,
                args.seed,
            ))
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let bands: Vec<_> = config.bands.iter().map(|b| b.kind).collect();
    let source = open_source(&cli.command, &config)?;
    let mut recorder = cli
        .csv_out
        .as_deref()
        .map(|path| ResultRecorder::create(path, &bands))
        .transpose()?;
    let mut driver = StreamDriver::new(source, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    while let Some(item) = driver.next_record() {
        let record = item?;
        let line = OutputLine {
            record: &record,
            dominant_hz: cli
                .peaks
                .map(|size| driver.pipeline().latest_spectrum(size).dominant_frequencies()),
        };
        serde_json::to_writer(&mut out, &line).context("encoding result record")?;
        writeln!(out).context("writing to stdout")?;
        if let Some(recorder) = recorder.as_mut() {
            recorder
                .write_record(&record)
                .context("writing result row")?;
        }
    }
    out.flush().context("flushing stdout")?;
    if let Some(recorder) = recorder {
        recorder.finish().context("closing result file")?;
    }
    info!(
        "done: {} records emitted, {} sample-sets rejected",
        driver.emitted(),
        driver.rejected()
    );
    Ok(())
}

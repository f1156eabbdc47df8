// src/cli.rs
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "neuromood",
    version,
    about = "Band-power analysis and mood colouring for streamed EEG",
    long_about = "Streams multi-channel EEG sample-sets through zero-phase band-pass filters,\n\
                  prints one JSON result record per sample-set on stdout and logs to stderr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON pipeline configuration; unset fields fall back to the playback preset
    #[arg(long, global = true, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in configuration
    #[arg(
        long,
        global = true,
        default_value = "playback",
        value_parser = ["playback", "detail", "summary"]
    )]
    pub preset: String,

    /// Pause between sample-sets, in milliseconds
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Evaluate band/channel pairs on the rayon thread pool
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Also write result rows to this CSV file
    #[arg(long, global = true)]
    pub csv_out: Option<PathBuf>,

    /// Add each channel's dominant frequency, from an FFT of this many samples
    #[arg(long, global = true, value_name = "FFT_SIZE")]
    pub peaks: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a recorded CSV (Timestamp column plus one column per channel)
    Replay(ReplayArgs),
    /// Stream seeded synthetic EEG
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Recording to replay
    pub file: PathBuf,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Length of the synthetic stream in seconds
    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    /// Random seed for the noise component
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffaccel")]
#[command(about = "GPU-accelerated ffmpeg transcoder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append raw probe output to ffaccel.log in the current directory
    #[arg(long, global = true)]
    pub debug_log: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List detected GPUs
    Detect {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a file or stream with the best available acceleration
    Encode {
        /// Input file path or stream URL
        input: String,

        /// Output file path or stream URL (defaults to the settings value)
        #[arg(short, long)]
        output: Option<String>,

        /// CRF/QP value, 0-51, lower is better
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=51))]
        quality: Option<u8>,

        /// Ignore detected GPUs and encode with libx264
        #[arg(long)]
        software: bool,

        /// Print the ffmpeg command without running it
        #[arg(long)]
        dry_run: bool,

        /// Offer playback after encoding (overrides settings)
        #[arg(long, conflicts_with = "no_play")]
        play: bool,

        /// Don't offer playback after encoding (overrides settings)
        #[arg(long, conflicts_with = "play")]
        no_play: bool,
    },

    /// Check if ffmpeg and ffprobe are installed
    CheckFfmpeg,
}

pub fn parse() -> Cli {
    Cli::parse()
}

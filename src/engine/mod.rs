// Encoding engine: profile selection, ffmpeg invocation and software fallbacks

pub mod command;
pub mod fallback;
pub mod ffmpeg_info;
pub mod profile;
pub mod validate;

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::warn;

pub use command::{
    OutputFormat, build_ffmpeg_args, build_ffmpeg_cmd, format_args, is_streaming_url, run_ffmpeg,
};
pub use fallback::{FallbackMethod, fallback_methods, try_fallbacks_with};
pub use ffmpeg_info::{ffmpeg_version, ffprobe_version, find_on_path, output_size_mb};
pub use profile::{Acceleration, EncodingProfile};
pub use validate::{SetupReport, validate_setup};

use crate::config::ProcessingConfig;

/// How a finished encode went
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    pub elapsed: Duration,
    /// Description of the software fallback that produced the output, if any
    pub fallback: Option<&'static str>,
    /// Output size in MB for file outputs
    pub output_size_mb: Option<f64>,
}

/// Encode with the configured acceleration, then the software fallbacks
pub fn transcode(cfg: &ProcessingConfig) -> Result<EncodeOutcome> {
    transcode_with(cfg, run_ffmpeg)
}

pub fn transcode_with<F>(cfg: &ProcessingConfig, mut run: F) -> Result<EncodeOutcome>
where
    F: FnMut(&[String]) -> Result<()>,
{
    let args = build_ffmpeg_args(cfg);
    println!("Command: ffmpeg {}", format_args(&args));
    println!("{}", "-".repeat(50));

    let started = Instant::now();
    let fallback = match run(&args) {
        Ok(()) => None,
        Err(err) => {
            warn!(acceleration = %cfg.acceleration, error = %err, "primary encode failed");
            println!("FFmpeg exited with error: {:#}", err);
            let method = try_fallbacks_with(cfg, &mut run)
                .context("all encoding methods failed")?;
            Some(method)
        }
    };

    Ok(EncodeOutcome {
        elapsed: started.elapsed(),
        fallback,
        output_size_mb: output_size_mb(&cfg.output),
    })
}

/// `1h 2m 3s`, `4m 5s` or `6s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

// Software re-encode attempts after the accelerated run fails

use anyhow::{Result, bail};
use tracing::{info, warn};

use super::command::{OutputFormat, format_args};
use crate::config::ProcessingConfig;

/// Extra muxer options when publishing to an RTSP URL
pub const RTSP_PUBLISHER_ARGS: [&str; 14] = [
    "-rtsp_transport",
    "tcp",
    "-muxdelay",
    "0.1",
    "-bufsize",
    "64k",
    "-maxrate",
    "2000k",
    "-rtsp_flags",
    "listen",
    "-timeout",
    "5000000",
    "-stimeout",
    "5000000",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMethod {
    pub description: &'static str,
    pub args: Vec<String>,
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// The three software attempts, most capable first
pub fn fallback_methods(cfg: &ProcessingConfig) -> Vec<FallbackMethod> {
    let quality = cfg.quality.to_string();

    let base = strings(&[
        "-i",
        cfg.input.as_str(),
        "-c:v",
        "libx264",
        "-fflags",
        "nobuffer",
        "-flags",
        "low_delay",
        "-fflags",
        "+discardcorrupt",
        "-analyzeduration",
        "0",
        "-probesize",
        "32",
        "-preset",
        "ultrafast",
        "-tune",
        "zerolatency",
        "-crf",
        quality.as_str(),
        "-c:a",
        "copy",
    ]);
    let tail = strings(&["-movflags", "+faststart", "-y", cfg.output.as_str()]);

    let format = OutputFormat::detect(&cfg.output);
    let mut auto_format = base.clone();
    auto_format.extend(format.args());
    if format == OutputFormat::Rtsp {
        auto_format.extend(strings(&RTSP_PUBLISHER_ARGS));
    }
    auto_format.extend(tail.iter().cloned());

    let mut forced_mp4 = base;
    forced_mp4.extend(OutputFormat::Mp4.args());
    forced_mp4.extend(tail);

    let minimal = strings(&[
        "-i",
        cfg.input.as_str(),
        "-c:v",
        "libx264",
        "-preset",
        "ultrafast",
        "-crf",
        quality.as_str(),
        "-c:a",
        "copy",
        "-y",
        cfg.output.as_str(),
    ]);

    vec![
        FallbackMethod {
            description: "Software encoding (libx264) with auto-detected output format",
            args: auto_format,
        },
        FallbackMethod {
            description: "Software encoding (libx264) with MP4 format fallback",
            args: forced_mp4,
        },
        FallbackMethod {
            description: "Basic software encoding (minimal options)",
            args: minimal,
        },
    ]
}

/// Try each fallback with `run` until one succeeds; returns the winning description
pub fn try_fallbacks_with<F>(cfg: &ProcessingConfig, mut run: F) -> Result<&'static str>
where
    F: FnMut(&[String]) -> Result<()>,
{
    let methods = fallback_methods(cfg);
    let total = methods.len();

    for (i, method) in methods.iter().enumerate() {
        println!("\nAttempt {}/{}: {}", i + 1, total, method.description);
        println!("Running: ffmpeg {}", format_args(&method.args));

        match run(&method.args) {
            Ok(()) => {
                info!(method = method.description, "fallback succeeded");
                println!("Fallback method succeeded: {}", method.description);
                return Ok(method.description);
            }
            Err(err) => {
                warn!(attempt = i + 1, error = %err, "fallback failed");
                println!("Fallback {} failed: {:#}", i + 1, err);
            }
        }
    }

    bail!("All fallback encoding methods failed")
}

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::profile::Acceleration;
use crate::config::ProcessingConfig;

/// Render node used for VAAPI device initialisation
pub const VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Output options applied to every primary run, in order
pub const LOW_LATENCY_ARGS: [&str; 16] = [
    "-movflags",
    "+faststart",
    "-bf",
    "0",
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
    "-tune",
    "zerolatency",
];

const STREAMING_SCHEMES: [&str; 9] = [
    "rtmp://", "rtmps://", "rtsp://", "rtsps://", "srt://", "udp://", "tcp://", "http://",
    "https://",
];

/// ffmpeg muxer selected from the output path or URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp4,
    Matroska,
    Avi,
    Mov,
    Webm,
    Flv,
    Mpegts,
    Hls,
    Dash,
    Rtsp,
}

impl OutputFormat {
    /// Streaming URLs are matched by scheme, files by extension; unknown files are mp4
    pub fn detect(output: &str) -> Self {
        let lower = output.to_lowercase();

        if is_streaming_url(&lower) {
            return if lower.starts_with("rtmp://") || lower.starts_with("rtmps://") {
                OutputFormat::Flv
            } else if lower.starts_with("rtsp://") || lower.starts_with("rtsps://") {
                OutputFormat::Rtsp
            } else if lower.starts_with("http://") || lower.starts_with("https://") {
                if lower.contains(".m3u8") {
                    OutputFormat::Hls
                } else if lower.contains(".mpd") {
                    OutputFormat::Dash
                } else {
                    OutputFormat::Mpegts
                }
            } else {
                // srt, udp, tcp
                OutputFormat::Mpegts
            };
        }

        let ext = Path::new(&lower)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext {
            "mkv" => OutputFormat::Matroska,
            "avi" => OutputFormat::Avi,
            "mov" => OutputFormat::Mov,
            "webm" => OutputFormat::Webm,
            "flv" => OutputFormat::Flv,
            "ts" => OutputFormat::Mpegts,
            "m3u8" => OutputFormat::Hls,
            _ => OutputFormat::Mp4,
        }
    }

    pub fn muxer(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Matroska => "matroska",
            OutputFormat::Avi => "avi",
            OutputFormat::Mov => "mov",
            OutputFormat::Webm => "webm",
            OutputFormat::Flv => "flv",
            OutputFormat::Mpegts => "mpegts",
            OutputFormat::Hls => "hls",
            OutputFormat::Dash => "dash",
            OutputFormat::Rtsp => "rtsp",
        }
    }

    /// `-f <muxer>` plus playlist options for HLS
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.muxer().to_string()];
        if *self == OutputFormat::Hls {
            args.extend(["-hls_time", "10", "-hls_list_size", "0"].map(String::from));
        }
        args
    }
}

pub fn is_streaming_url(output: &str) -> bool {
    let lower = output.to_lowercase();
    STREAMING_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Input-side flags that set up hardware decoding or the VAAPI device
pub fn hwaccel_args(acceleration: Acceleration) -> Vec<String> {
    let device = format!("vaapi=va:{}", VAAPI_DEVICE);
    let args: &[&str] = match acceleration {
        Acceleration::Cuda => &["-hwaccel", "cuda", "-hwaccel_output_format", "cuda"],
        Acceleration::Qsv => &["-hwaccel", "qsv"],
        Acceleration::Vaapi => &[
            "-init_hw_device",
            device.as_str(),
            "-filter_hw_device",
            "va",
            "-hwaccel_output_format",
            "vaapi",
        ],
        Acceleration::VideoToolbox => &["-hwaccel", "videotoolbox"],
        Acceleration::D3d11va => &["-hwaccel", "d3d11va"],
        Acceleration::Software => &[],
    };
    args.iter().map(|a| a.to_string()).collect()
}

/// Codec selection and rate control for the configured encoder
pub fn video_codec_args(cfg: &ProcessingConfig) -> Vec<String> {
    let quality = cfg.quality.to_string();
    let q = quality.as_str();
    let preset = cfg.preset.as_str();
    let codec = cfg.codec.as_str();

    let args: Vec<&str> = match codec {
        "h264_nvenc" => vec![
            "-c:v", codec, "-preset", preset, "-rc", "vbr", "-cq", q, "-b:v", "0",
        ],
        "h264_qsv" => vec!["-c:v", codec, "-preset", preset, "-global_quality", q],
        "h264_vaapi" => vec!["-vf", "format=nv12,hwupload", "-c:v", codec, "-qp", q],
        "h264_videotoolbox" => vec!["-c:v", codec, "-q:v", q],
        "h264_amf" => vec![
            "-c:v", codec, "-quality", preset, "-rc", "cqp", "-qp_i", q, "-qp_p", q,
        ],
        // Anything else is encoded in software
        _ => vec!["-c:v", "libx264", "-preset", preset, "-crf", q],
    };
    args.into_iter().map(String::from).collect()
}

/// Full argument list for the primary (accelerated) attempt
pub fn build_ffmpeg_args(cfg: &ProcessingConfig) -> Vec<String> {
    let mut args = hwaccel_args(cfg.acceleration);

    args.push("-i".to_string());
    args.push(cfg.input.clone());

    args.extend(video_codec_args(cfg));
    args.extend(["-c:a", "copy"].map(String::from));
    args.extend(OutputFormat::detect(&cfg.output).args());
    args.extend(LOW_LATENCY_ARGS.iter().map(|a| a.to_string()));

    args.push("-y".to_string());
    args.push(cfg.output.clone());
    args
}

pub fn build_ffmpeg_cmd(cfg: &ProcessingConfig) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(build_ffmpeg_args(cfg));
    cmd
}

/// Shell-quoted rendering for display, e.g. `ffmpeg -i 'my clip.mp4' ...`
pub fn format_args(args: &[String]) -> String {
    shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
}

/// Run ffmpeg with the given arguments, streaming its output to the terminal
pub fn run_ffmpeg(args: &[String]) -> Result<()> {
    info!(command = %format_args(args), "running ffmpeg");

    let status = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .context("Failed to execute ffmpeg. Is ffmpeg installed and in PATH?")?;

    if !status.success() {
        debug!(%status, "ffmpeg exited unsuccessfully");
        bail!("ffmpeg exited with {}", status);
    }
    Ok(())
}

//! Pre-flight checks for the chosen encoding setup.
//!
//! Findings are advisory: a missing ffmpeg or render node is reported as a
//! warning and the run continues, falling back to software if needed.

use std::path::{Path, PathBuf};

use super::ffmpeg_info::tool_version;
use super::profile::Acceleration;
use crate::config::ProcessingConfig;
use crate::gpu::CommandRunner;

pub const RENDER_NODES: [&str; 2] = ["/dev/dri/renderD128", "/dev/dri/renderD129"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    /// `ffmpeg -version` first line, when ffmpeg runs
    pub ffmpeg_version: Option<String>,
    /// First render node found (VAAPI only)
    pub render_node: Option<PathBuf>,
    /// Whether vainfo lists H.264 (VAAPI only, `None` when vainfo is unavailable)
    pub vaapi_h264: Option<bool>,
    pub warnings: Vec<String>,
}

impl SetupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check ffmpeg and, for VAAPI, the render nodes and vainfo's profile list
pub fn validate_setup<R: CommandRunner + ?Sized>(
    cfg: &ProcessingConfig,
    runner: &R,
) -> SetupReport {
    let nodes: Vec<&Path> = RENDER_NODES.into_iter().map(Path::new).collect();
    validate_setup_with_nodes(cfg, runner, &nodes)
}

pub fn validate_setup_with_nodes<R: CommandRunner + ?Sized>(
    cfg: &ProcessingConfig,
    runner: &R,
    render_nodes: &[&Path],
) -> SetupReport {
    let mut report = SetupReport::default();

    match tool_version(runner, "ffmpeg") {
        Ok(version) => report.ffmpeg_version = Some(version),
        Err(_) => {
            report
                .warnings
                .push("ffmpeg not found in PATH. Please install FFmpeg".to_string());
            return report;
        }
    }

    if cfg.acceleration != Acceleration::Vaapi {
        return report;
    }

    report.render_node = render_nodes
        .iter()
        .find(|node| node.exists())
        .map(|node| node.to_path_buf());

    if report.render_node.is_none() {
        report.warnings.push(
            "No render nodes found. VAAPI may not work properly. \
             Install drivers (mesa-va-drivers, intel-media-va-driver) and add your user to the video group"
                .to_string(),
        );
    }

    if let Ok(output) = runner.run("vainfo", &["-a"]) {
        let h264 = output.to_lowercase().contains("h264");
        report.vaapi_h264 = Some(h264);
        if !h264 {
            report
                .warnings
                .push("H.264 encoding may not be available through VAAPI".to_string());
        }
    }

    report
}

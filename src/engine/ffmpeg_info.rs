use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::gpu::{CommandRunner, SystemRunner};

/// Check if ffmpeg is available and return its version
pub fn ffmpeg_version() -> Result<String> {
    tool_version(&SystemRunner::default(), "ffmpeg")
}

/// Check if ffprobe is available
pub fn ffprobe_version() -> Result<String> {
    tool_version(&SystemRunner::default(), "ffprobe")
}

/// First line of `<tool> -version`
pub fn tool_version<R: CommandRunner + ?Sized>(runner: &R, tool: &str) -> Result<String> {
    let output = runner
        .run(tool, &["-version"])
        .with_context(|| format!("Failed to execute {}. Is {} installed and in PATH?", tool, tool))?;

    let first_line = output.lines().next().unwrap_or("Unknown version");
    Ok(first_line.trim().to_string())
}

/// Locate `program` in the directories listed in PATH
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| executable_in(&dir, program))
}

fn executable_in(dir: &Path, program: &str) -> Option<PathBuf> {
    let candidate = dir.join(program);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        let exe = dir.join(format!("{}.exe", program));
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}

/// Size of a finished output file in MB, when the output is a local file
pub fn output_size_mb(output: &str) -> Option<f64> {
    let meta = std::fs::metadata(output).ok()?;
    meta.is_file().then(|| meta.len() as f64 / (1024.0 * 1024.0))
}

// Optional playback of the encoded result

use anyhow::{Result, bail};
use std::io::{BufRead, Write};
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::engine::find_on_path;

/// A video player we know how to launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub program: &'static str,
    pub name: &'static str,
}

/// Tried in order; the first one on PATH is used
pub const PLAYERS: [Player; 3] = [
    Player {
        program: "ffplay",
        name: "FFplay",
    },
    Player {
        program: "vlc",
        name: "VLC",
    },
    Player {
        program: "mpv",
        name: "MPV",
    },
];

const FFPLAY_CONTROLS: &str = "\
FFplay controls:
   Space: Pause/Play
   Left/Right: Seek -/+10 seconds
   Up/Down: Seek -/+1 minute
   f: Toggle fullscreen
   q: Quit";

impl Player {
    pub fn args(&self, video: &str) -> Vec<String> {
        let args: &[&str] = match self.program {
            "ffplay" => &["-autoexit", "-window_title", "Processed Video", video],
            "vlc" => &["--intf", "dummy", "--play-and-exit", video],
            _ => &["--really-quiet", video],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

/// `y` / `yes` in any case
pub fn wants_playback(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Ask whether to play `video` and play it on a yes
pub fn offer_playback<R: BufRead, W: Write>(video: &str, input: &mut R, out: &mut W) -> Result<()> {
    write!(out, "\nWould you like to play the processed video? (y/n): ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    if wants_playback(&answer) {
        play_video(video)
    } else {
        Ok(())
    }
}

/// First player from [`PLAYERS`] found on PATH
pub fn available_player() -> Option<Player> {
    PLAYERS
        .into_iter()
        .find(|player| find_on_path(player.program).is_some())
}

pub fn play_video(video: &str) -> Result<()> {
    println!("Opening video: {}", video);

    let Some(player) = available_player() else {
        println!("No video player found. Please install one of:");
        println!("   - FFmpeg (ffplay): https://ffmpeg.org/download.html");
        println!("   - VLC: https://www.videolan.org/vlc/");
        println!("   - MPV: https://mpv.io/");
        bail!("no video player available");
    };

    println!("Using {}", player.name);
    let mut child = Command::new(player.program)
        .args(player.args(video))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?;

    if player.program == "ffplay" {
        println!("{}", FFPLAY_CONTROLS);
    }

    let status = child.wait()?;
    if status.success() {
        info!(player = player.name, "playback finished");
        println!("Video playback finished");
    } else {
        warn!(player = player.name, %status, "player exited with error");
        println!("{} exited with error: {}", player.name, status);
    }
    Ok(())
}

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result, bail};
use ffaccel::config::{ProcessingConfig, Settings, parse_quality};
use ffaccel::engine::{self, EncodingProfile, validate_setup};
use ffaccel::gpu::{GpuDetector, GpuInfo, Platform, SystemRunner};
use ffaccel::{log, player};
use std::io::{self, BufRead, Write};

const RULE_WIDTH: usize = 50;

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Detect { json }) => handle_detect(&settings, json),
        Some(Commands::Encode {
            input,
            output,
            quality,
            software,
            dry_run,
            play,
            no_play,
        }) => {
            let offer_playback = if play {
                true
            } else if no_play {
                false
            } else {
                settings.playback.offer
            };
            handle_encode(
                &settings,
                EncodeRequest {
                    input,
                    output,
                    quality,
                    software,
                    dry_run,
                    offer_playback,
                },
            )
        }
        Some(Commands::CheckFfmpeg) => handle_check_ffmpeg(),
        None => run_interactive(&settings),
    }
}

struct EncodeRequest {
    input: String,
    output: Option<String>,
    quality: Option<u8>,
    software: bool,
    dry_run: bool,
    offer_playback: bool,
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn detect_gpus(settings: &Settings) -> Vec<GpuInfo> {
    let gpus = GpuDetector::with_timeout(settings.detection_timeout()).detect();
    for gpu in &gpus {
        log::record(&format!("detected: {}", gpu.summary()));
    }
    gpus
}

fn print_gpus(gpus: &[GpuInfo]) {
    for line in gpu_listing(gpus) {
        println!("{}", line);
    }
    println!("{}", rule());
}

/// Numbered GPU listing, starting at 1; sentinel errors become warnings
fn gpu_listing(gpus: &[GpuInfo]) -> Vec<String> {
    let (failures, found): (Vec<&GpuInfo>, Vec<&GpuInfo>) =
        gpus.iter().partition(|gpu| gpu.is_sentinel());

    let mut lines = Vec::new();
    if found.is_empty() {
        lines.push("No GPUs detected".to_string());
    } else {
        lines.push(format!("Found {} GPU(s):", found.len()));
    }

    for (number, gpu) in found.iter().enumerate().map(|(i, gpu)| (i + 1, gpu)) {
        lines.push(format!("  {}. {}", number, gpu.summary()));
        if let Some(address) = &gpu.pci_address {
            lines.push(format!("     PCI: {}", address));
        }
    }
    for gpu in failures {
        if let Some(err) = &gpu.error {
            lines.push(format!("     Warning: {}", err));
        }
    }
    lines
}

fn handle_detect(settings: &Settings, json: bool) -> Result<()> {
    let gpus = detect_gpus(settings);

    if json {
        let out = serde_json::to_string_pretty(&gpus).context("Failed to serialize GPU list")?;
        println!("{}", out);
    } else {
        print_gpus(&gpus);
    }
    Ok(())
}

/// Processing config for the primary GPU, or software when forced or nothing usable was found
fn configure(
    settings: &Settings,
    gpus: &[GpuInfo],
    force_software: bool,
    platform: Platform,
) -> ProcessingConfig {
    let mut cfg = ProcessingConfig::from_settings(settings);

    if !force_software && !settings.encoding.force_software {
        if let Some(primary) = gpus.first() {
            cfg.apply_profile(EncodingProfile::for_gpu(primary, platform));
        }
    }

    cfg
}

fn print_configuration(cfg: &ProcessingConfig) {
    if cfg.acceleration.is_hardware() {
        println!("Hardware acceleration: {} ({})", cfg.acceleration, cfg.codec);
    } else {
        println!("Using software encoding (no GPU acceleration)");
    }
    println!("Quality setting: {}, Preset: {}", cfg.quality, cfg.preset);
    println!("{}", rule());
}

fn report_setup(settings: &Settings, cfg: &ProcessingConfig) {
    let runner = SystemRunner::new(settings.detection_timeout());
    let report = validate_setup(cfg, &runner);

    if let Some(node) = &report.render_node {
        println!("Found render node: {}", node.display());
    }
    if report.vaapi_h264 == Some(true) {
        println!("VAAPI H.264 encoding support detected");
    }
    for warning in &report.warnings {
        println!("Setup validation warning: {}", warning);
    }
}

fn encode(cfg: &ProcessingConfig) -> Result<()> {
    println!("\nStarting video processing...");
    let outcome = engine::transcode(cfg)?;

    println!(
        "Video processing completed in {}",
        engine::format_elapsed(outcome.elapsed)
    );
    println!("Output saved to: {}", cfg.output);
    if let Some(size) = outcome.output_size_mb {
        println!("Output file size: {:.2} MB", size);
    }
    Ok(())
}

fn handle_encode(settings: &Settings, request: EncodeRequest) -> Result<()> {
    let gpus = if request.software {
        Vec::new()
    } else {
        detect_gpus(settings)
    };

    let mut cfg = configure(settings, &gpus, request.software, Platform::current());
    cfg.input = request.input;
    if let Some(output) = request.output {
        cfg.output = output;
    }
    if let Some(quality) = request.quality {
        cfg.quality = quality;
    }

    if request.dry_run {
        let args = engine::build_ffmpeg_args(&cfg);
        println!("ffmpeg {}", engine::format_args(&args));
        return Ok(());
    }

    print_configuration(&cfg);
    report_setup(settings, &cfg);
    encode(&cfg)?;

    if request.offer_playback {
        let stdin = io::stdin();
        player::offer_playback(&cfg.output, &mut stdin.lock(), &mut io::stdout())?;
    }
    Ok(())
}

fn handle_check_ffmpeg() -> Result<()> {
    let version = engine::ffmpeg_version()?;
    println!("ffmpeg found: {}", version);

    let probe_version = engine::ffprobe_version()?;
    println!("ffprobe found: {}", probe_version);
    Ok(())
}

/// Ask for input, output and quality; blank answers keep the defaults
fn prompt_processing<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    cfg: &mut ProcessingConfig,
) -> Result<()> {
    let source = prompt(input, out, "Enter input video file path or stream URL: ")?;
    if source.is_empty() {
        bail!("no input provided");
    }
    cfg.input = source;

    let output = prompt(input, out, &format!("Output file (default: {}): ", cfg.output))?;
    if !output.is_empty() {
        cfg.output = output;
    }

    let quality = prompt(
        input,
        out,
        &format!("Quality (CRF/QP, default: {}, lower=better): ", cfg.quality),
    )?;
    if !quality.is_empty() {
        match parse_quality(&quality) {
            Some(q) => cfg.quality = q,
            None => writeln!(
                out,
                "Ignoring quality {:?}: expected 0-51, keeping {}",
                quality, cfg.quality
            )?,
        }
    }
    Ok(())
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String> {
    write!(out, "{}", question)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn run_interactive(settings: &Settings) -> Result<()> {
    println!("FFmpeg GPU-Accelerated Video Processor");
    println!("{}", "=".repeat(RULE_WIDTH));

    println!("Detecting GPU hardware...");
    let gpus = detect_gpus(settings);
    print_gpus(&gpus);

    let mut cfg = configure(settings, &gpus, false, Platform::current());
    print_configuration(&cfg);
    report_setup(settings, &cfg);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    prompt_processing(&mut input, &mut stdout, &mut cfg).context("input failed")?;
    encode(&cfg).context("video processing failed")?;

    if settings.playback.offer {
        player::offer_playback(&cfg.output, &mut input, &mut stdout)?;
    }
    Ok(())
}

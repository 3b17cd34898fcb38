//! GPU detection and normalization
//!
//! Queries platform inventory tools, parses their ad-hoc output, classifies
//! the vendor of each device and merges overlapping observations into one
//! record per physical GPU:
//! - Windows: PowerShell CIM (JSON), PowerShell WMI, then WMIC, first hit wins
//! - Linux: lspci, lshw, the NVIDIA proc file and glxinfo, all merged
//! - macOS: system_profiler

mod classify;
mod merge;
mod parsers;
mod probe;
mod runner;
mod text;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub use classify::{
    GENERIC_TERMS, VENDOR_PATTERNS, VendorName, classify_vendor, is_generic_gpu,
    normalize_vendor_name,
};
pub use merge::{is_same_gpu, merge_gpu_info};
pub use parsers::{
    parse_glxinfo_output, parse_lshw_output, parse_lspci_output, parse_mac_output,
    parse_nvidia_proc, parse_windows_json, parse_windows_key_value, parse_windows_output,
};
pub use probe::{LINUX_PROBES, NVIDIA_PROC_VERSION, Platform, Probe, WINDOWS_PROBES};
pub use runner::{CommandRunner, DEFAULT_TIMEOUT, ProbeError, SystemRunner};
pub use text::{
    extract_memory_from_size, extract_nvidia_version, extract_pci_address, format_memory,
    split_into_blocks, split_key_value,
};

const WINDOWS_FAILURE: &str = "Failed to detect GPU using all Windows methods";
const LINUX_FAILURE: &str = "Could not detect GPU. Consider installing lspci, lshw, or mesa-utils";

/// GPU vendor, inferred from model names or vendor strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    #[default]
    Unknown,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::Nvidia,
        Vendor::Amd,
        Vendor::Intel,
        Vendor::Apple,
        Vendor::Unknown,
    ];

    /// Lower-case tag used in JSON output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Nvidia => "nvidia",
            Vendor::Amd => "amd",
            Vendor::Intel => "intel",
            Vendor::Apple => "apple",
            Vendor::Unknown => "unknown",
        }
    }

    /// Human-facing vendor name
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Nvidia => "NVIDIA",
            Vendor::Amd => "AMD",
            Vendor::Intel => "Intel",
            Vendor::Apple => "Apple",
            Vendor::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected GPU, or a sentinel describing why detection failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub vendor: Vendor,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_version: Option<String>,
    /// Bus address (Linux only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci_address: Option<String>,
    /// Source text this record was parsed from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GpuInfo {
    pub fn new(vendor: Vendor, model: impl Into<String>) -> Self {
        Self {
            vendor,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Record standing in for "no GPU could be detected"
    pub fn sentinel(error: impl Into<String>) -> Self {
        Self {
            vendor: Vendor::Unknown,
            model: "unknown".to_string(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// A candidate is only usable when it names a device
    pub fn is_valid(&self) -> bool {
        !self.model.trim().is_empty()
    }

    /// One-line description, e.g. `NVIDIA GeForce RTX 3080 (10.0 GB) [Driver: 535.129.03]`.
    /// The vendor is only prefixed when the model doesn't already start with it.
    pub fn summary(&self) -> String {
        let vendor = self.vendor.display_name();
        let mut line = if self.model.starts_with(vendor) {
            self.model.clone()
        } else {
            format!("{} {}", vendor, self.model)
        };
        if let Some(memory) = &self.memory {
            line.push_str(&format!(" ({})", memory));
        }
        if let Some(driver) = &self.driver_version {
            line.push_str(&format!(" [Driver: {}]", driver));
        }
        line
    }
}

/// Runs the probe set for one platform and reconciles the results
pub struct GpuDetector<R: CommandRunner = SystemRunner> {
    runner: R,
    platform: Platform,
}

impl GpuDetector<SystemRunner> {
    /// Detector for the host platform with the default 10s per-command timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            runner: SystemRunner::new(timeout),
            platform: Platform::current(),
        }
    }
}

impl Default for GpuDetector<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> GpuDetector<R> {
    pub fn with_runner(runner: R, platform: Platform) -> Self {
        Self { runner, platform }
    }

    /// Detect all GPUs. Never empty: failures come back as one sentinel record.
    pub fn detect(&self) -> Vec<GpuInfo> {
        debug!(platform = %self.platform, "starting GPU detection");
        let gpus = match self.platform {
            Platform::Windows => self.detect_windows(),
            Platform::Linux => self.detect_linux(),
            Platform::MacOs => self.detect_macos(),
            Platform::Other(os) => {
                vec![GpuInfo::sentinel(format!("Unsupported operating system: {}", os))]
            }
        };
        info!(count = gpus.len(), "GPU detection finished");
        gpus
    }

    /// First detected GPU (or the sentinel)
    pub fn detect_primary(&self) -> GpuInfo {
        self.detect()
            .into_iter()
            .next()
            .unwrap_or_else(|| GpuInfo::sentinel("Detection failed: no result"))
    }

    fn detect_windows(&self) -> Vec<GpuInfo> {
        for probe in WINDOWS_PROBES {
            match probe.run(&self.runner) {
                Ok(gpus) if !gpus.is_empty() => {
                    info!(probe = probe.label(), count = gpus.len(), "Windows strategy succeeded");
                    return gpus;
                }
                Ok(_) => debug!(probe = probe.label(), "strategy returned no usable records"),
                Err(err) => debug!(probe = probe.label(), error = %err, "strategy failed"),
            }
        }
        vec![GpuInfo::sentinel(WINDOWS_FAILURE)]
    }

    fn detect_linux(&self) -> Vec<GpuInfo> {
        // lspci is taken as-is; every later probe only enriches or appends
        let mut gpus = Vec::new();
        for (index, probe) in LINUX_PROBES.iter().enumerate() {
            let found = self.run_probe(*probe);
            if index == 0 {
                gpus = found;
            } else if !found.is_empty() {
                gpus = merge_gpu_info(gpus, found);
            }
        }

        if gpus.is_empty() {
            vec![GpuInfo::sentinel(LINUX_FAILURE)]
        } else {
            gpus
        }
    }

    fn detect_macos(&self) -> Vec<GpuInfo> {
        match Probe::SystemProfiler.run(&self.runner) {
            Ok(gpus) if !gpus.is_empty() => gpus,
            Ok(_) => vec![GpuInfo::sentinel(
                "system_profiler reported no usable display adapters",
            )],
            Err(err) => vec![GpuInfo::sentinel(format!(
                "Failed to run system_profiler: {}",
                err
            ))],
        }
    }

    /// Failures stop here: an unavailable probe contributes nothing
    fn run_probe(&self, probe: Probe) -> Vec<GpuInfo> {
        match probe.run(&self.runner) {
            Ok(gpus) => {
                debug!(probe = probe.label(), count = gpus.len(), "probe finished");
                gpus
            }
            Err(err) => {
                debug!(probe = probe.label(), error = %err, "probe unavailable");
                Vec::new()
            }
        }
    }
}

/// Detect GPUs on the host with default settings
pub fn detect() -> Vec<GpuInfo> {
    GpuDetector::new().detect()
}

/// Primary GPU on the host with default settings
pub fn detect_primary() -> GpuInfo {
    GpuDetector::new().detect_primary()
}

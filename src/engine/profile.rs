// Mapping from a detected GPU to an ffmpeg acceleration method, codec and preset

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gpu::{GpuInfo, Platform, Vendor};

/// Hardware acceleration method passed to ffmpeg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    Cuda,
    Qsv,
    Vaapi,
    VideoToolbox,
    D3d11va,
    /// CPU encoding with libx264
    #[default]
    #[serde(rename = "none")]
    Software,
}

impl Acceleration {
    /// Pick the acceleration for a vendor; Intel and AMD differ between Windows and the rest
    pub fn for_vendor(vendor: Vendor, platform: Platform) -> Self {
        match vendor {
            Vendor::Nvidia => Acceleration::Cuda,
            Vendor::Intel if platform == Platform::Windows => Acceleration::Qsv,
            Vendor::Intel => Acceleration::Vaapi,
            Vendor::Amd if platform == Platform::Windows => Acceleration::D3d11va,
            Vendor::Amd => Acceleration::Vaapi,
            Vendor::Apple => Acceleration::VideoToolbox,
            Vendor::Unknown => Acceleration::Software,
        }
    }

    pub fn codec(&self) -> &'static str {
        match self {
            Acceleration::Cuda => "h264_nvenc",
            Acceleration::Qsv => "h264_qsv",
            Acceleration::Vaapi => "h264_vaapi",
            Acceleration::VideoToolbox => "h264_videotoolbox",
            Acceleration::D3d11va => "h264_amf",
            Acceleration::Software => "libx264",
        }
    }

    pub fn preset(&self) -> &'static str {
        match self {
            Acceleration::Cuda | Acceleration::Qsv => "medium",
            Acceleration::Vaapi => "ultrafast",
            Acceleration::VideoToolbox | Acceleration::D3d11va => "balanced",
            Acceleration::Software => "medium",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Acceleration::Cuda => "cuda",
            Acceleration::Qsv => "qsv",
            Acceleration::Vaapi => "vaapi",
            Acceleration::VideoToolbox => "videotoolbox",
            Acceleration::D3d11va => "d3d11va",
            Acceleration::Software => "none",
        }
    }

    pub fn is_hardware(&self) -> bool {
        *self != Acceleration::Software
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acceleration, codec and preset chosen for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    pub acceleration: Acceleration,
    pub codec: &'static str,
    pub preset: &'static str,
}

impl EncodingProfile {
    pub fn for_acceleration(acceleration: Acceleration) -> Self {
        Self {
            acceleration,
            codec: acceleration.codec(),
            preset: acceleration.preset(),
        }
    }

    pub fn software() -> Self {
        Self::for_acceleration(Acceleration::Software)
    }

    /// Profile for the primary GPU. A sentinel or unclassified GPU gets software encoding.
    pub fn for_gpu(gpu: &GpuInfo, platform: Platform) -> Self {
        if gpu.is_sentinel() {
            return Self::software();
        }
        Self::for_acceleration(Acceleration::for_vendor(gpu.vendor, platform))
    }
}

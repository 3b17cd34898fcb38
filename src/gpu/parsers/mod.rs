// Per-tool output parsers. Each turns raw text into zero or more GpuInfo
// candidates and applies the same validity and generic-adapter filters.

mod linux;
mod macos;
mod windows;

pub use linux::{parse_glxinfo_output, parse_lshw_output, parse_lspci_output, parse_nvidia_proc};
pub use macos::parse_mac_output;
pub use windows::{parse_windows_json, parse_windows_key_value, parse_windows_output};

use super::{GpuInfo, Vendor, classify_vendor, is_generic_gpu};

/// Final gate for every candidate: drop unnamed and generic adapters, and
/// classify the vendor from the model when no tool reported one.
fn finish(mut gpu: GpuInfo) -> Option<GpuInfo> {
    gpu.model = gpu.model.trim().to_string();
    if !gpu.is_valid() || is_generic_gpu(&gpu.model) {
        return None;
    }
    if gpu.vendor == Vendor::Unknown {
        gpu.vendor = classify_vendor(&gpu.model);
    }
    Some(gpu)
}

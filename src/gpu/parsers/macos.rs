// system_profiler SPDisplaysDataType output

use super::finish;
use crate::gpu::text::{non_empty, split_into_blocks};
use crate::gpu::{GpuInfo, Vendor, normalize_vendor_name};

/// Parse `system_profiler SPDisplaysDataType`, one record per adapter block
pub fn parse_mac_output(output: &str) -> Vec<GpuInfo> {
    split_into_blocks(output)
        .into_iter()
        .filter_map(|block| {
            let mut gpu = GpuInfo::default();

            for line in block.lines() {
                let line = line.trim();
                if line.contains("Chipset Model:") {
                    if let Some((_, model)) = line.split_once(':') {
                        gpu.model = model.trim().to_string();
                    }
                } else if line.contains("VRAM") {
                    // "VRAM (Total): 8 GB" is already human readable
                    if let Some((_, memory)) = line.split_once(':') {
                        gpu.memory = non_empty(memory);
                    }
                } else if let Some(vendor) = line.strip_prefix("Vendor:") {
                    if gpu.vendor == Vendor::Unknown {
                        if let Some(known) = normalize_vendor_name(vendor).known() {
                            gpu.vendor = known;
                        }
                    }
                }
            }

            gpu.raw_output = block;
            finish(gpu)
        })
        .collect()
}

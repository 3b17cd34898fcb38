// lspci, lshw, /proc/driver/nvidia/version and glxinfo output

use regex::Regex;
use std::sync::OnceLock;

use super::finish;
use crate::gpu::text::{
    compiled, extract_memory_from_size, extract_nvidia_version, extract_pci_address,
    format_memory, pci_address_re, split_into_blocks,
};
use crate::gpu::{GpuInfo, Vendor, normalize_vendor_name};

const RENDERER_PREFIX: &str = "OpenGL renderer string:";

static DISPLAY_CLASS_RE: OnceLock<Regex> = OnceLock::new();
static LSPCI_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
static VIDEO_MEMORY_RE: OnceLock<Regex> = OnceLock::new();

/// Parse an lspci listing (plain or `-v`).
///
/// Only device header lines are matched against the display classes; the
/// indented detail lines of `-v` output are kept as the record's raw output.
pub fn parse_lspci_output(output: &str) -> Vec<GpuInfo> {
    let class_re = compiled(&DISPLAY_CLASS_RE, r"(?i)^(VGA|3D|Display)[^:]*:\s*(.+)$");
    let suffix_re = compiled(&LSPCI_SUFFIX_RE, r"\s*\((?:rev|prog-if) [^)]*\)");

    device_listings(output)
        .into_iter()
        .filter_map(|(header, listing)| {
            let header = header.as_str();
            let caps = class_re.captures(strip_address(header))?;
            let model = suffix_re
                .replace_all(caps.get(2)?.as_str(), "")
                .trim()
                .to_string();

            let pci_address = pci_address_re()
                .find(header)
                .map(|m| m.as_str().to_string())
                .or_else(|| extract_pci_address(&listing, &model));

            finish(GpuInfo {
                model,
                pci_address,
                raw_output: listing,
                ..GpuInfo::default()
            })
        })
        .collect()
}

/// Group an lspci listing into (header line, header + indented details).
///
/// A header holding only a bus address takes the first indented line as its
/// class line, e.g. `0000:03:00.0` followed by `\tVGA compatible controller: ...`.
fn device_listings(output: &str) -> Vec<(String, String)> {
    let mut listings: Vec<(String, Vec<&str>)> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let indented = line.starts_with(char::is_whitespace);
        match listings.last_mut() {
            Some((header, lines)) if indented => {
                if lines.len() == 1 && strip_address(header).is_empty() {
                    header.push(' ');
                    header.push_str(line.trim());
                }
                lines.push(line);
            }
            _ => listings.push((line.to_string(), vec![line])),
        }
    }

    listings
        .into_iter()
        .map(|(header, lines)| (header, lines.join("\n")))
        .collect()
}

fn strip_address(line: &str) -> &str {
    match pci_address_re().find(line) {
        Some(m) => line[m.end()..].trim_start(),
        None => line.trim_start(),
    }
}

/// Parse `lshw -C display` output, one record per `*-display` node
pub fn parse_lshw_output(output: &str) -> Vec<GpuInfo> {
    split_lshw_nodes(output)
        .into_iter()
        .filter_map(|node| {
            let mut gpu = GpuInfo::default();

            for line in node.lines() {
                let line = line.trim();
                if let Some(product) = line.strip_prefix("product:") {
                    gpu.model = product.trim().to_string();
                } else if let Some(vendor) = line.strip_prefix("vendor:") {
                    // An unrecognised vendor leaves classification to the model name
                    if gpu.vendor == Vendor::Unknown {
                        if let Some(known) = normalize_vendor_name(vendor).known() {
                            gpu.vendor = known;
                        }
                    }
                } else if let Some(bus) = line.strip_prefix("bus info:") {
                    gpu.pci_address = bus.trim().strip_prefix("pci@").map(str::to_string);
                } else if line.contains("size:") && line.contains("bytes") {
                    gpu.memory = extract_memory_from_size(line);
                }
            }

            gpu.raw_output = node;
            finish(gpu)
        })
        .collect()
}

/// lshw prints consecutive nodes without blank lines between them
fn split_lshw_nodes(output: &str) -> Vec<String> {
    let mut nodes = Vec::new();

    for block in split_into_blocks(output) {
        let mut current: Vec<&str> = Vec::new();
        for line in block.lines() {
            if line.trim_start().starts_with("*-") && !current.is_empty() {
                nodes.push(current.join("\n"));
                current.clear();
            }
            current.push(line);
        }
        if !current.is_empty() {
            nodes.push(current.join("\n"));
        }
    }

    nodes
}

/// The proc file only exists with the proprietary driver loaded, so its
/// presence alone identifies an NVIDIA GPU.
pub fn parse_nvidia_proc(data: &str) -> Vec<GpuInfo> {
    finish(GpuInfo {
        vendor: Vendor::Nvidia,
        model: format!("{} GPU", Vendor::Nvidia.display_name()),
        driver_version: extract_nvidia_version(data),
        raw_output: data.trim().to_string(),
        ..GpuInfo::default()
    })
    .into_iter()
    .collect()
}

/// Parse the OpenGL renderer string (and video memory, when reported) from glxinfo
pub fn parse_glxinfo_output(output: &str) -> Vec<GpuInfo> {
    let memory = compiled(&VIDEO_MEMORY_RE, r"(?i)video memory:\s*(\d+)\s*MB")
        .captures(output)
        .and_then(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .and_then(|mb| mb.checked_mul(1024 * 1024))
        .map(|bytes| format_memory(&bytes.to_string()));

    output
        .lines()
        .filter_map(|line| {
            let idx = line.find(RENDERER_PREFIX)?;
            let renderer = &line[idx + RENDERER_PREFIX.len()..];
            // "NVIDIA GeForce RTX 3080/PCIe/SSE2" -> "NVIDIA GeForce RTX 3080"
            let model = renderer.split('/').next().unwrap_or_default().trim();

            finish(GpuInfo {
                model: model.to_string(),
                memory: memory.clone(),
                raw_output: line.trim().to_string(),
                ..GpuInfo::default()
            })
        })
        .collect()
}

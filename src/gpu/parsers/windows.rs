// Win32_VideoController output: PowerShell JSON, Format-List and WMIC /format:list

use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use super::finish;
use crate::gpu::GpuInfo;
use crate::gpu::text::{compiled, format_memory, non_empty, split_into_blocks, split_key_value};

static JSON_NAME_RE: OnceLock<regex::Regex> = OnceLock::new();
static JSON_DRIVER_RE: OnceLock<regex::Regex> = OnceLock::new();
static JSON_RAM_RE: OnceLock<regex::Regex> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct VideoController {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "VideoProcessor")]
    video_processor: Option<String>,
    #[serde(rename = "DriverVersion")]
    driver_version: Option<String>,
    #[serde(rename = "AdapterRAM")]
    adapter_ram: Option<u64>,
}

/// Dispatch on the shape of the output: JSON from the CIM query, key/value
/// blocks from the WMI and WMIC queries.
pub fn parse_windows_output(output: &str) -> Vec<GpuInfo> {
    if output.contains('{') && output.contains('}') {
        parse_windows_json(output)
    } else {
        parse_windows_key_value(output)
    }
}

/// Parse `Format-List` / `wmic /format:list` blocks, one adapter per block
pub fn parse_windows_key_value(output: &str) -> Vec<GpuInfo> {
    split_into_blocks(output)
        .into_iter()
        .filter_map(|block| {
            let mut gpu = GpuInfo::default();

            for line in block.lines() {
                let Some((key, value)) = split_key_value(line) else {
                    continue;
                };

                if key.contains("name") {
                    gpu.model = value.to_string();
                } else if key.contains("videoprocessor") {
                    if gpu.model.is_empty() {
                        gpu.model = value.to_string();
                    }
                } else if key.contains("driverversion") {
                    gpu.driver_version = non_empty(value);
                } else if key.contains("adapterram") {
                    gpu.memory = non_empty(value).map(|v| format_memory(&v));
                }
            }

            gpu.raw_output = block;
            finish(gpu)
        })
        .collect()
}

/// Parse `ConvertTo-Json` output: a single object or an array of objects.
/// Text that is not valid JSON is scanned field by field instead.
pub fn parse_windows_json(output: &str) -> Vec<GpuInfo> {
    let value: Value = match serde_json::from_str(output.trim()) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "CIM output is not valid JSON, scanning fields");
            return scan_json_fields(output);
        }
    };

    let objects = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    objects
        .into_iter()
        .filter_map(|object| {
            let raw_output = object.to_string();
            let controller: VideoController = serde_json::from_value(object).ok()?;

            let model = controller
                .name
                .filter(|name| !name.trim().is_empty())
                .or(controller.video_processor)
                .unwrap_or_default();

            finish(GpuInfo {
                model,
                driver_version: controller.driver_version.as_deref().and_then(non_empty),
                memory: controller
                    .adapter_ram
                    .map(|bytes| format_memory(&bytes.to_string())),
                raw_output,
                ..GpuInfo::default()
            })
        })
        .collect()
}

/// Regex scan for JSON-ish text, one candidate per `{ ... }` object
fn scan_json_fields(output: &str) -> Vec<GpuInfo> {
    let name_re = compiled(&JSON_NAME_RE, r#""Name":\s*"([^"]+)""#);
    let driver_re = compiled(&JSON_DRIVER_RE, r#""DriverVersion":\s*"([^"]+)""#);
    let ram_re = compiled(&JSON_RAM_RE, r#""AdapterRAM":\s*(\d+)"#);

    output
        .split('}')
        .filter_map(|chunk| {
            let model = name_re.captures(chunk)?.get(1)?.as_str().to_string();
            let driver_version = driver_re
                .captures(chunk)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
            let memory = ram_re
                .captures(chunk)
                .and_then(|caps| caps.get(1))
                .map(|m| format_memory(m.as_str()));

            finish(GpuInfo {
                model,
                driver_version,
                memory,
                raw_output: chunk.trim().to_string(),
                ..GpuInfo::default()
            })
        })
        .collect()
}

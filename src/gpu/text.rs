// Text helpers shared by the output parsers

use regex::Regex;
use std::sync::OnceLock;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

static DIGITS_RE: OnceLock<Regex> = OnceLock::new();
static PCI_ADDRESS_RE: OnceLock<Regex> = OnceLock::new();
static NVIDIA_VERSION_RE: OnceLock<Regex> = OnceLock::new();
static SIZE_BYTES_RE: OnceLock<Regex> = OnceLock::new();

pub(crate) fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern must compile"))
}

pub(crate) fn pci_address_re() -> &'static Regex {
    compiled(
        &PCI_ADDRESS_RE,
        r"^(?i)((?:[0-9a-f]{4}:)?[0-9a-f]{2}:[0-9a-f]{2}\.[0-9a-f])",
    )
}

/// Split text into chunks separated by blank (whitespace-only) lines.
/// Blank lines never appear inside a chunk.
pub fn split_into_blocks(output: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

/// Split a `key: value` (or `key=value`) line on its first delimiter.
/// The key comes back lower-cased and trimmed, the value trimmed.
pub fn split_key_value(line: &str) -> Option<(String, &str)> {
    let idx = line.find([':', '='])?;
    let key = line[..idx].trim().to_lowercase();
    let value = line[idx + 1..].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Render a raw byte count for display.
///
/// `>= 1 GiB` becomes `"x.y GB"`, `>= 1 MiB` becomes `"n MB"`; anything
/// smaller or unparsable is returned unchanged.
pub fn format_memory(raw: &str) -> String {
    let Some(digits) = compiled(&DIGITS_RE, r"\d+").find(raw) else {
        return raw.to_string();
    };

    match digits.as_str().parse::<u64>() {
        Ok(bytes) if bytes >= GIB => format!("{:.1} GB", bytes as f64 / GIB as f64),
        Ok(bytes) if bytes >= MIB => format!("{:.0} MB", bytes as f64 / MIB as f64),
        _ => raw.to_string(),
    }
}

/// Memory from an lshw-style `size: <n> bytes` line
pub fn extract_memory_from_size(line: &str) -> Option<String> {
    let caps = compiled(&SIZE_BYTES_RE, r"size:\s*(\d+)\s*bytes").captures(line)?;
    Some(format_memory(caps.get(1)?.as_str()))
}

/// Find the bus address for `model` in a multi-line listing.
///
/// The address is read from the start of the line naming the model, or from
/// the line right before it when the listing puts the address on its own line.
pub fn extract_pci_address(listing: &str, model: &str) -> Option<String> {
    if model.is_empty() {
        return None;
    }

    let lines: Vec<&str> = listing.lines().collect();
    let re = pci_address_re();

    for (i, line) in lines.iter().enumerate() {
        if !line.contains(model) {
            continue;
        }
        if let Some(m) = re.find(line) {
            return Some(m.as_str().to_string());
        }
        if i > 0 {
            if let Some(m) = re.find(lines[i - 1]) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// Driver version from the contents of /proc/driver/nvidia/version
pub fn extract_nvidia_version(data: &str) -> Option<String> {
    let caps = compiled(&NVIDIA_VERSION_RE, r"NVIDIA.*?(\d+\.\d+(?:\.\d+)?)").captures(data)?;
    Some(caps.get(1)?.as_str().to_string())
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

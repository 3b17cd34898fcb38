// Vendor classification and generic-adapter filtering

use super::Vendor;

/// Model-name patterns per vendor, checked in order; the first group with a
/// matching substring wins.
pub const VENDOR_PATTERNS: &[(Vendor, &[&str])] = &[
    (
        Vendor::Nvidia,
        &[
            "nvidia", "geforce", "quadro", "tesla", "rtx", "gtx", "titan", "nvs",
        ],
    ),
    (
        Vendor::Amd,
        &[
            "amd",
            "radeon",
            "rx ",
            "vega",
            "navi",
            "rdna",
            "ati technologies",
            "ati ",
            "firepro",
            "firegl",
            "instinct",
        ],
    ),
    (
        Vendor::Intel,
        &[
            "intel",
            "iris",
            "uhd graphics",
            "hd graphics",
            "xe graphics",
            "arc(tm)",
            "[arc ",
        ],
    ),
    (Vendor::Apple, &["apple", "m1", "m2", "m3", "m4"]),
];

/// Substrings marking software renderers and virtual or fallback adapters
pub const GENERIC_TERMS: &[&str] = &[
    "basic",
    "generic",
    "standard",
    "vnc",
    "virtual",
    "vmware",
    "vbox",
    "hyper-v",
    "parallels",
    "remote display",
    "llvmpipe",
    "softpipe",
    "swrast",
];

/// Guess the vendor from a free-text model name
pub fn classify_vendor(model: &str) -> Vendor {
    let lower = model.to_lowercase();
    VENDOR_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| lower.contains(p)))
        .map(|(vendor, _)| *vendor)
        .unwrap_or(Vendor::Unknown)
}

/// True for adapters that must never be reported as a GPU
pub fn is_generic_gpu(model: &str) -> bool {
    let lower = model.to_lowercase();
    GENERIC_TERMS.iter().any(|term| lower.contains(term))
}

/// A vendor string reported directly by a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorName {
    Known(Vendor),
    /// Lower-cased original when no known vendor matched
    Other(String),
}

impl VendorName {
    pub fn known(&self) -> Option<Vendor> {
        match self {
            VendorName::Known(vendor) => Some(*vendor),
            VendorName::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VendorName::Known(vendor) => vendor.as_str(),
            VendorName::Other(name) => name,
        }
    }
}

/// Map a reported vendor string (`"NVIDIA Corporation"`, `"Apple (0x106b)"`)
/// onto the canonical tags.
pub fn normalize_vendor_name(vendor: &str) -> VendorName {
    let lower = vendor.trim().to_lowercase();
    let is_ati = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == "ati");

    if lower.contains("nvidia") {
        VendorName::Known(Vendor::Nvidia)
    } else if lower.contains("amd") || lower.contains("advanced micro devices") || is_ati {
        VendorName::Known(Vendor::Amd)
    } else if lower.contains("intel") {
        VendorName::Known(Vendor::Intel)
    } else if lower.contains("apple") {
        VendorName::Known(Vendor::Apple)
    } else {
        VendorName::Other(lower)
    }
}

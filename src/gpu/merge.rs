// Merging of partial GPU records from independent probes

use super::GpuInfo;
use tracing::debug;

/// Whether two records describe the same device.
///
/// Heuristic: same vendor and one model string contains the other. Two
/// distinct cards of one family can be merged by mistake; a stricter match
/// (vendor + bus address) would replace this predicate.
pub fn is_same_gpu(a: &GpuInfo, b: &GpuInfo) -> bool {
    let (a_name, b_name) = (match_name(a), match_name(b));
    a.vendor == b.vendor && (a_name.contains(b_name) || b_name.contains(a_name))
}

/// Vendor-only records such as `NVIDIA GPU` are compared by vendor name
fn match_name(gpu: &GpuInfo) -> &str {
    let vendor = gpu.vendor.display_name();
    match gpu.model.strip_prefix(vendor) {
        Some(" GPU") => vendor,
        _ => &gpu.model,
    }
}

/// Merge `new` records into `existing`.
///
/// A matching record only has its empty fields filled in; values already
/// set are kept. Records without a match are appended in order.
pub fn merge_gpu_info(existing: Vec<GpuInfo>, new: Vec<GpuInfo>) -> Vec<GpuInfo> {
    let mut result = existing;

    for gpu in new {
        match result.iter_mut().find(|current| is_same_gpu(current, &gpu)) {
            Some(current) => {
                debug!(existing = %current.model, incoming = %gpu.model, "merging GPU records");
                back_fill(current, gpu);
            }
            None => result.push(gpu),
        }
    }

    result
}

fn back_fill(target: &mut GpuInfo, source: GpuInfo) {
    if target.memory.is_none() {
        target.memory = source.memory;
    }
    if target.driver_version.is_none() {
        target.driver_version = source.driver_version;
    }
    if target.pci_address.is_none() {
        target.pci_address = source.pci_address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Vendor;

    fn gpu(vendor: Vendor, model: &str) -> GpuInfo {
        GpuInfo::new(vendor, model)
    }

    #[test]
    fn test_back_fill_keeps_first_model() {
        let existing = vec![gpu(Vendor::Nvidia, "GeForce RTX 3080")];
        let mut incoming = gpu(Vendor::Nvidia, "RTX 3080");
        incoming.memory = Some("10.0 GB".to_string());

        let merged = merge_gpu_info(existing, vec![incoming]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].model, "GeForce RTX 3080");
        assert_eq!(merged[0].memory.as_deref(), Some("10.0 GB"));
    }

    #[test]
    fn test_existing_values_win() {
        let mut first = gpu(Vendor::Nvidia, "NVIDIA Corporation GA102 [GeForce RTX 3080]");
        first.driver_version = Some("535.129.03".to_string());
        let mut second = gpu(Vendor::Nvidia, "NVIDIA GPU");
        second.driver_version = Some("999.0".to_string());
        second.pci_address = Some("0000:01:00.0".to_string());

        let merged = merge_gpu_info(vec![first], vec![second]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].driver_version.as_deref(), Some("535.129.03"));
        assert_eq!(merged[0].pci_address.as_deref(), Some("0000:01:00.0"));
    }

    #[test]
    fn test_vendor_only_record_matches_by_vendor() {
        let named = gpu(Vendor::Nvidia, "NVIDIA Corporation GA102 [GeForce RTX 3080]");
        assert!(is_same_gpu(&named, &gpu(Vendor::Nvidia, "NVIDIA GPU")));
        assert!(!is_same_gpu(&named, &gpu(Vendor::Nvidia, "Quadro GPU")));
        assert!(!is_same_gpu(
            &gpu(Vendor::Intel, "Intel UHD Graphics 630"),
            &gpu(Vendor::Nvidia, "NVIDIA GPU")
        ));
    }

    #[test]
    fn test_empty_merge_is_identity() {
        let mut a = gpu(Vendor::Intel, "UHD Graphics 630");
        a.pci_address = Some("00:02.0".to_string());
        let existing = vec![a, gpu(Vendor::Nvidia, "GeForce RTX 3080")];

        let merged = merge_gpu_info(existing.clone(), Vec::new());
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_different_vendor_appends() {
        let existing = vec![gpu(Vendor::Intel, "UHD Graphics 630")];
        let merged = merge_gpu_info(existing, vec![gpu(Vendor::Nvidia, "GeForce RTX 3080")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].vendor, Vendor::Intel);
        assert_eq!(merged[1].vendor, Vendor::Nvidia);
    }

    #[test]
    fn test_same_vendor_without_overlap_appends() {
        let existing = vec![gpu(Vendor::Nvidia, "GeForce RTX 3080")];
        let merged = merge_gpu_info(existing, vec![gpu(Vendor::Nvidia, "Quadro P400")]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_into_empty_appends_all() {
        let merged = merge_gpu_info(
            Vec::new(),
            vec![gpu(Vendor::Amd, "Radeon RX 6800"), gpu(Vendor::Intel, "Iris Xe")],
        );
        assert_eq!(merged.len(), 2);
    }
}

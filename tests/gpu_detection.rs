use ffaccel::gpu::{
    CommandRunner, GpuDetector, GpuInfo, NVIDIA_PROC_VERSION, Platform, ProbeError, Vendor,
    classify_vendor, format_memory, is_generic_gpu, merge_gpu_info, parse_glxinfo_output,
    parse_lshw_output, parse_lspci_output, parse_mac_output, parse_nvidia_proc,
    parse_windows_output,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

/// Replays canned tool output; anything not scripted behaves like a missing binary
#[derive(Default)]
struct ScriptedRunner {
    responses: HashMap<&'static str, String>,
    calls: RefCell<Vec<&'static str>>,
}

impl ScriptedRunner {
    fn with(mut self, key: &'static str, output: &str) -> Self {
        self.responses.insert(key, output.to_string());
        self
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn respond(&self, key: &'static str, program: &str) -> Result<String, ProbeError> {
        self.calls.borrow_mut().push(key);
        self.responses
            .get(key)
            .cloned()
            .ok_or_else(|| ProbeError::Spawn {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}

fn key(program: &str, args: &[&str]) -> &'static str {
    match program {
        "powershell" if args.iter().any(|a| a.contains("ConvertTo-Json")) => "cim",
        "powershell" => "wmi",
        "wmic" => "wmic",
        "lspci" if args.is_empty() => "lspci",
        "lspci" => "lspci -v",
        "lshw" => "lshw",
        "glxinfo" => "glxinfo",
        "system_profiler" => "system_profiler",
        _ => "other",
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        self.respond(key(program, args), program)
    }

    fn read_file(&self, path: &Path) -> Result<String, ProbeError> {
        assert_eq!(path, Path::new(NVIDIA_PROC_VERSION));
        self.respond("nvidia proc", "read")
    }
}

const CIM_JSON: &str = r#"[
    {"Name": "NVIDIA GeForce RTX 4070", "VideoProcessor": "NVIDIA GeForce RTX 4070", "DriverVersion": "32.0.15.6094", "AdapterRAM": 4293918720},
    {"Name": "Intel(R) UHD Graphics 770", "DriverVersion": "31.0.101.4502", "AdapterRAM": 1073741824}
]"#;

const WMI_BASIC_ONLY: &str = "\r\nName           : Microsoft Basic Display Adapter\r\nDriverVersion  : 10.0.19041.1\r\n\r\n";

const WMIC_LIST: &str = "\r\r\n\r\r\nAdapterRAM=4293918720\r\r\nDriverVersion=31.0.21912.14\r\r\nName=AMD Radeon RX 6600\r\r\nVideoProcessor=AMD Radeon Graphics Processor (0x73FF)\r\r\n\r\r\n";

const LSPCI_V: &str = "\
00:02.0 VGA compatible controller: Intel Corporation CoffeeLake-S GT2 [UHD Graphics 630] (rev 02) (prog-if 00 [VGA controller])
\tSubsystem: Dell Device 0869
\tKernel driver in use: i915

01:00.0 VGA compatible controller: NVIDIA Corporation GA102 [GeForce RTX 3080] (rev a1) (prog-if 00 [VGA controller])
\tSubsystem: NVIDIA Corporation Device 1467
\tKernel driver in use: nvidia
";

const LSHW: &str = "\
  *-display
       description: VGA compatible controller
       product: GA102 [GeForce RTX 3080]
       vendor: NVIDIA Corporation
       bus info: pci@0000:01:00.0
  *-display
       description: VGA compatible controller
       product: CoffeeLake-S GT2 [UHD Graphics 630]
       vendor: Intel Corporation
       bus info: pci@0000:00:02.0
       size: 268435456 bytes
";

const NVIDIA_VERSION: &str =
    "NVRM version: NVIDIA UNIX x86_64 Kernel Module  535.129.03  Thu Oct 19 18:56:32 UTC 2023\n";

const SYSTEM_PROFILER: &str = "\
Graphics/Displays:

    Apple M1 Max:

      Chipset Model: Apple M1 Max
      Type: GPU
      Bus: Built-In
      Total Number of Cores: 32
      Vendor: Apple (0x106b)
";

fn detect(runner: &ScriptedRunner, platform: Platform) -> Vec<GpuInfo> {
    GpuDetector::with_runner(runner, platform).detect()
}

#[test]
fn windows_cim_result_wins() {
    let runner = ScriptedRunner::default()
        .with("cim", CIM_JSON)
        .with("wmic", WMIC_LIST);

    let gpus = detect(&runner, Platform::Windows);

    assert_eq!(runner.calls(), vec!["cim"]);
    assert_eq!(gpus.len(), 2);
    assert_eq!(gpus[0].vendor, Vendor::Nvidia);
    assert_eq!(gpus[0].memory.as_deref(), Some("4.0 GB"));
    assert_eq!(gpus[1].vendor, Vendor::Intel);
}

#[test]
fn windows_falls_through_to_wmic() {
    // CIM missing, WMI only reports the basic adapter
    let runner = ScriptedRunner::default()
        .with("wmi", WMI_BASIC_ONLY)
        .with("wmic", WMIC_LIST);

    let gpus = detect(&runner, Platform::Windows);

    assert_eq!(runner.calls(), vec!["cim", "wmi", "wmic"]);
    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0].vendor, Vendor::Amd);
    assert_eq!(gpus[0].model, "AMD Radeon RX 6600");
    assert_eq!(gpus[0].driver_version.as_deref(), Some("31.0.21912.14"));
}

#[test]
fn windows_all_strategies_failing_yields_sentinel() {
    let runner = ScriptedRunner::default();
    let gpus = detect(&runner, Platform::Windows);

    assert_eq!(gpus.len(), 1);
    assert!(gpus[0].is_sentinel());
    assert_eq!(gpus[0].vendor, Vendor::Unknown);
    assert_eq!(gpus[0].model, "unknown");
    assert_eq!(
        gpus[0].error.as_deref(),
        Some("Failed to detect GPU using all Windows methods")
    );
}

#[test]
fn linux_sources_are_merged() {
    let runner = ScriptedRunner::default()
        .with("lspci -v", LSPCI_V)
        .with("lshw", LSHW)
        .with("nvidia proc", NVIDIA_VERSION);

    let gpus = detect(&runner, Platform::Linux);

    assert_eq!(runner.calls(), vec!["lspci -v", "lshw", "nvidia proc", "glxinfo"]);
    assert_eq!(gpus.len(), 2);

    let intel = &gpus[0];
    assert_eq!(intel.vendor, Vendor::Intel);
    assert_eq!(intel.model, "Intel Corporation CoffeeLake-S GT2 [UHD Graphics 630]");
    assert_eq!(intel.pci_address.as_deref(), Some("00:02.0"));
    assert_eq!(intel.memory.as_deref(), Some("256 MB"));

    let nvidia = &gpus[1];
    assert_eq!(nvidia.vendor, Vendor::Nvidia);
    assert_eq!(nvidia.pci_address.as_deref(), Some("01:00.0"));
    assert_eq!(nvidia.driver_version.as_deref(), Some("535.129.03"));
}

#[test]
fn linux_unmatched_renderer_is_appended() {
    let runner = ScriptedRunner::default()
        .with("lspci -v", LSPCI_V)
        .with(
            "glxinfo",
            "OpenGL renderer string: NVIDIA GeForce RTX 3080/PCIe/SSE2\n",
        );

    let gpus = detect(&runner, Platform::Linux);

    // The renderer name shares no substring with the lspci model
    assert_eq!(gpus.len(), 3);
    assert_eq!(gpus[2].model, "NVIDIA GeForce RTX 3080");
}

#[test]
fn linux_plain_lspci_when_verbose_fails() {
    let runner = ScriptedRunner::default().with(
        "lspci",
        "00:02.0 VGA compatible controller: Intel Corporation Alder Lake-P GT2 [Iris Xe Graphics] (rev 0c)\n",
    );

    let gpus = detect(&runner, Platform::Linux);

    assert_eq!(&runner.calls()[..2], &["lspci -v", "lspci"]);
    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0].vendor, Vendor::Intel);
}

#[test]
fn linux_glxinfo_alone_is_enough() {
    let runner = ScriptedRunner::default().with(
        "glxinfo",
        "OpenGL renderer string: AMD Radeon RX 6800 XT (radeonsi, navi21, LLVM 15.0.7, DRM 3.49)\n",
    );

    let gpus = detect(&runner, Platform::Linux);
    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0].vendor, Vendor::Amd);
}

#[test]
fn linux_nothing_found_yields_sentinel() {
    let runner = ScriptedRunner::default().with(
        "lspci -v",
        "00:0f.0 VGA compatible controller: VMware SVGA II Adapter\n",
    );

    let gpus = detect(&runner, Platform::Linux);

    assert_eq!(gpus.len(), 1);
    assert_eq!(
        gpus[0].error.as_deref(),
        Some("Could not detect GPU. Consider installing lspci, lshw, or mesa-utils")
    );
}

#[test]
fn macos_system_profiler() {
    let runner = ScriptedRunner::default().with("system_profiler", SYSTEM_PROFILER);
    let gpus = detect(&runner, Platform::MacOs);

    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0].vendor, Vendor::Apple);
    assert_eq!(gpus[0].model, "Apple M1 Max");
}

#[test]
fn macos_failures_yield_sentinel() {
    let missing = detect(&ScriptedRunner::default(), Platform::MacOs);
    assert_eq!(missing.len(), 1);
    assert!(
        missing[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Failed to run system_profiler")
    );

    let empty = detect(
        &ScriptedRunner::default().with("system_profiler", "Graphics/Displays:\n"),
        Platform::MacOs,
    );
    assert_eq!(empty.len(), 1);
    assert!(empty[0].is_sentinel());
}

#[test]
fn unsupported_platform_runs_nothing() {
    let runner = ScriptedRunner::default();
    let gpus = detect(&runner, Platform::Other("freebsd"));

    assert!(runner.calls().is_empty());
    assert_eq!(gpus.len(), 1);
    assert_eq!(
        gpus[0].error.as_deref(),
        Some("Unsupported operating system: freebsd")
    );
}

#[test]
fn primary_is_first_record() {
    let runner = ScriptedRunner::default().with("cim", CIM_JSON);
    let primary = GpuDetector::with_runner(&runner, Platform::Windows).detect_primary();
    assert_eq!(primary.model, "NVIDIA GeForce RTX 4070");
}

#[test]
fn json_output_shape() {
    let runner = ScriptedRunner::default().with("nvidia proc", NVIDIA_VERSION);
    let gpus = detect(&runner, Platform::Linux);

    let value = serde_json::to_value(&gpus[0]).unwrap();
    assert_eq!(value["vendor"], "nvidia");
    assert_eq!(value["model"], "NVIDIA GPU");
    assert_eq!(value["driver_version"], "535.129.03");
    assert!(value.get("memory").is_none());
    assert!(value.get("error").is_none());
}

fn platforms() -> impl Strategy<Value = Platform> {
    prop_oneof![
        Just(Platform::Windows),
        Just(Platform::Linux),
        Just(Platform::MacOs),
    ]
}

const KEYS: [&str; 10] = [
    "cim",
    "wmi",
    "wmic",
    "lspci -v",
    "lspci",
    "lshw",
    "nvidia proc",
    "glxinfo",
    "system_profiler",
    "other",
];

/// One line in the style of the inventory tools, or noise
fn tool_line() -> impl Strategy<Value = String> {
    prop_oneof![
        r"([0-9a-f]{4}:)?[0-9a-f]{2}:[0-9a-f]{2}\.[0-7]( (VGA compatible controller|3D controller|Display controller|Audio device): [A-Za-z0-9 \[\]()]{0,30})?",
        r"\t(VGA compatible controller|3D controller|Subsystem|Kernel driver in use): [A-Za-z0-9 ]{0,20}",
        r" {0,4}\*-display( UNCLAIMED)?",
        r" {0,8}(product|vendor|bus info|size|Chipset Model|VRAM \(Total\)|Vendor|Name|VideoProcessor|DriverVersion|AdapterRAM)[:=] ?[A-Za-z0-9 @.:]{0,24}",
        r"OpenGL renderer string: [A-Za-z0-9 /()]{0,24}",
        r"    Video memory: [0-9]{1,5}MB",
        r"[{}\[\]]?",
        ".{0,40}",
    ]
}

/// Multi-line tool output with single and blank-line separators
fn tool_output() -> impl Strategy<Value = String> {
    proptest::collection::vec((tool_line(), any::<bool>()), 0..24).prop_map(|lines| {
        lines
            .into_iter()
            .map(|(line, gap)| if gap { line + "\n\n" } else { line + "\n" })
            .collect()
    })
}

type Parser = fn(&str) -> Vec<GpuInfo>;

const PARSERS: [(&str, Parser); 6] = [
    ("windows", parse_windows_output),
    ("lspci", parse_lspci_output),
    ("lshw", parse_lshw_output),
    ("nvidia proc", parse_nvidia_proc),
    ("glxinfo", parse_glxinfo_output),
    ("system_profiler", parse_mac_output),
];

proptest! {
    #[test]
    fn parsers_keep_only_named_physical_adapters(text in tool_output()) {
        for (name, parse) in PARSERS {
            for gpu in parse(&text) {
                prop_assert!(!gpu.model.trim().is_empty(), "{} produced an unnamed record", name);
                prop_assert!(!is_generic_gpu(&gpu.model), "{} kept {:?}", name, gpu.model);
                prop_assert!(gpu.error.is_none());
            }
        }
    }

    #[test]
    fn lspci_bare_address_line_takes_following_class(
        address in r"[0-9a-f]{4}:[0-9a-f]{2}:[0-9a-f]{2}\.[0-7]",
        model in "[A-Z][a-z]{2,8} [A-Z][a-z0-9]{2,8}",
    ) {
        prop_assume!(!is_generic_gpu(&model));
        let listing = format!("{}\n\tVGA compatible controller: {}\n", address, model);

        let gpus = parse_lspci_output(&listing);
        prop_assert_eq!(gpus.len(), 1);
        prop_assert_eq!(&gpus[0].model, &model);
        prop_assert_eq!(gpus[0].pci_address.as_deref(), Some(address.as_str()));
    }

    #[test]
    fn detection_never_returns_empty_or_generic(
        platform in platforms(),
        outputs in proptest::collection::vec(proptest::option::of(tool_output()), KEYS.len()),
    ) {
        let mut runner = ScriptedRunner::default();
        for (key, output) in KEYS.iter().zip(outputs) {
            if let Some(output) = output {
                runner = runner.with(*key, &output);
            }
        }

        let gpus = detect(&runner, platform);
        prop_assert!(!gpus.is_empty());

        for gpu in &gpus {
            if gpu.is_sentinel() {
                prop_assert_eq!(gpus.len(), 1);
                prop_assert_eq!(gpu.vendor, Vendor::Unknown);
            } else {
                prop_assert!(!gpu.model.trim().is_empty());
                prop_assert!(!is_generic_gpu(&gpu.model));
            }
        }
    }

    #[test]
    fn nvidia_terms_always_win(prefix in "[a-z ]{0,12}", suffix in "[a-z0-9 ]{0,12}") {
        let model = format!("{}GeForce{}", prefix, suffix);
        prop_assert_eq!(classify_vendor(&model), Vendor::Nvidia);
    }

    #[test]
    fn generic_terms_always_filtered(prefix in "[A-Za-z ]{0,12}", suffix in "[A-Za-z0-9 ]{0,12}") {
        let model = format!("{}VMware{}", prefix, suffix);
        prop_assert!(is_generic_gpu(&model));
    }

    #[test]
    fn memory_units_by_threshold(bytes in 0u64..(1u64 << 40)) {
        let formatted = format_memory(&bytes.to_string());
        if bytes >= 1 << 30 {
            prop_assert!(formatted.ends_with(" GB"));
        } else if bytes >= 1 << 20 {
            prop_assert!(formatted.ends_with(" MB"));
        } else {
            prop_assert_eq!(formatted, bytes.to_string());
        }
    }

    #[test]
    fn merge_never_loses_records(
        existing in proptest::collection::vec("[A-Za-z0-9 ]{1,16}", 0..5),
        incoming in proptest::collection::vec("[A-Za-z0-9 ]{1,16}", 0..5),
    ) {
        let to_gpus = |models: &[String]| -> Vec<GpuInfo> {
            models.iter().map(|m| GpuInfo::new(classify_vendor(m), m.as_str())).collect()
        };
        let before = to_gpus(&existing);
        let merged = merge_gpu_info(before.clone(), to_gpus(&incoming));

        prop_assert!(merged.len() >= before.len());
        prop_assert!(merged.len() <= before.len() + incoming.len());
        for (kept, original) in merged.iter().zip(&before) {
            prop_assert_eq!(&kept.model, &original.model);
        }
        prop_assert_eq!(merge_gpu_info(before.clone(), Vec::new()), before);
    }
}

// Platform identification and the external inventory sources per platform

use std::fmt;
use std::path::Path;
use tracing::{debug, trace};

use super::parsers::{
    parse_glxinfo_output, parse_lshw_output, parse_lspci_output, parse_mac_output,
    parse_nvidia_proc, parse_windows_output,
};
use super::runner::{CommandRunner, ProbeError};
use super::GpuInfo;

pub const NVIDIA_PROC_VERSION: &str = "/proc/driver/nvidia/version";

const CIM_QUERY: &str = "Get-CimInstance -ClassName Win32_VideoController | \
Where-Object {$_.Name -notlike '*Basic*' -and $_.Name -notlike '*Generic*' -and $_.Name -notlike '*VNC*'} | \
Select-Object Name, VideoProcessor, DriverVersion, AdapterRAM, PNPDeviceID | ConvertTo-Json";

const WMI_QUERY: &str = "Get-WmiObject -Class Win32_VideoController | \
Where-Object {$_.Name -notlike '*Basic*' -and $_.Name -notlike '*Generic*'} | \
Select-Object Name, VideoProcessor, DriverVersion, AdapterRAM | Format-List";

/// Windows strategies in fallback order; the first one with results wins
pub const WINDOWS_PROBES: [Probe; 3] = [Probe::WindowsCim, Probe::WindowsWmi, Probe::Wmic];

/// Linux sources in merge order; lspci seeds the list
pub const LINUX_PROBES: [Probe; 4] = [Probe::Lspci, Probe::Lshw, Probe::NvidiaProc, Probe::Glxinfo];

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other(&'static str),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &'static str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            other => Platform::Other(other),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => f.write_str("windows"),
            Platform::Linux => f.write_str("linux"),
            Platform::MacOs => f.write_str("macos"),
            Platform::Other(os) => f.write_str(os),
        }
    }
}

/// One external source of GPU information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    WindowsCim,
    WindowsWmi,
    Wmic,
    Lspci,
    Lshw,
    NvidiaProc,
    Glxinfo,
    SystemProfiler,
}

impl Probe {
    pub fn label(&self) -> &'static str {
        match self {
            Probe::WindowsCim => "PowerShell CIM",
            Probe::WindowsWmi => "PowerShell WMI",
            Probe::Wmic => "WMIC",
            Probe::Lspci => "lspci",
            Probe::Lshw => "lshw",
            Probe::NvidiaProc => "nvidia proc",
            Probe::Glxinfo => "glxinfo",
            Probe::SystemProfiler => "system_profiler",
        }
    }

    /// Collect the raw text for this source
    pub fn invoke<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<String, ProbeError> {
        match self {
            Probe::WindowsCim => runner.run("powershell", &["-NoProfile", "-Command", CIM_QUERY]),
            Probe::WindowsWmi => runner.run("powershell", &["-NoProfile", "-Command", WMI_QUERY]),
            Probe::Wmic => runner.run(
                "wmic",
                &[
                    "path",
                    "win32_VideoController",
                    "get",
                    "name,VideoProcessor,DriverVersion,AdapterRAM",
                    "/format:list",
                ],
            ),
            Probe::Lspci => runner.run("lspci", &["-v"]).or_else(|err| {
                debug!(error = %err, "lspci -v failed, retrying plain listing");
                runner.run("lspci", &[])
            }),
            Probe::Lshw => runner.run("lshw", &["-C", "display"]),
            Probe::NvidiaProc => runner.read_file(Path::new(NVIDIA_PROC_VERSION)),
            Probe::Glxinfo => runner.run("glxinfo", &[]),
            Probe::SystemProfiler => runner.run("system_profiler", &["SPDisplaysDataType"]),
        }
    }

    /// Parse raw text from this source into GPU candidates
    pub fn parse(&self, output: &str) -> Vec<GpuInfo> {
        match self {
            Probe::WindowsCim | Probe::WindowsWmi | Probe::Wmic => parse_windows_output(output),
            Probe::Lspci => parse_lspci_output(output),
            Probe::Lshw => parse_lshw_output(output),
            Probe::NvidiaProc => parse_nvidia_proc(output),
            Probe::Glxinfo => parse_glxinfo_output(output),
            Probe::SystemProfiler => parse_mac_output(output),
        }
    }

    pub fn run<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<Vec<GpuInfo>, ProbeError> {
        let output = self.invoke(runner)?;
        trace!(probe = self.label(), bytes = output.len(), "probe output");
        crate::log::record(&format!("{} output:\n{}", self.label(), output));
        Ok(self.parse(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail_verbose_lspci: bool,
    }

    impl CommandRunner for Recorder {
        fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
            self.calls
                .borrow_mut()
                .push(format!("{} {}", program, args.join(" ")).trim().to_string());
            if self.fail_verbose_lspci && program == "lspci" && !args.is_empty() {
                return Err(ProbeError::Exit {
                    program: program.to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
            Ok(String::new())
        }

        fn read_file(&self, path: &Path) -> Result<String, ProbeError> {
            self.calls.borrow_mut().push(format!("read {}", path.display()));
            Ok(String::new())
        }
    }

    fn recorder(fail_verbose_lspci: bool) -> Recorder {
        Recorder {
            calls: RefCell::new(Vec::new()),
            fail_verbose_lspci,
        }
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("freebsd"), Platform::Other("freebsd"));
        assert_eq!(Platform::Other("freebsd").to_string(), "freebsd");
    }

    #[test]
    fn test_lspci_falls_back_to_plain_listing() {
        let runner = recorder(true);
        Probe::Lspci.invoke(&runner).unwrap();
        assert_eq!(*runner.calls.borrow(), vec!["lspci -v", "lspci"]);
    }

    #[test]
    fn test_nvidia_probe_reads_proc_file() {
        let runner = recorder(false);
        Probe::NvidiaProc.invoke(&runner).unwrap();
        assert_eq!(
            *runner.calls.borrow(),
            vec!["read /proc/driver/nvidia/version"]
        );
    }

    #[test]
    fn test_wmic_arguments() {
        let runner = recorder(false);
        Probe::Wmic.invoke(&runner).unwrap();
        let calls = runner.calls.borrow();
        assert!(calls[0].starts_with("wmic path win32_VideoController get"));
        assert!(calls[0].ends_with("/format:list"));
    }

    #[test]
    fn test_cim_query_is_json() {
        assert!(CIM_QUERY.ends_with("ConvertTo-Json"));
        assert!(WMI_QUERY.ends_with("Format-List"));
    }

    #[test]
    fn test_windows_probes_accept_either_shape() {
        let json = r#"{"Name": "AMD Radeon RX 6600", "DriverVersion": "31.0.21912.14"}"#;
        let list = "Name=Intel(R) UHD Graphics 770\r\nDriverVersion=31.0.101.4502\r\n";

        for probe in WINDOWS_PROBES {
            let from_json = probe.parse(json);
            assert_eq!(from_json.len(), 1, "{}", probe.label());
            assert_eq!(from_json[0].model, "AMD Radeon RX 6600");

            let from_list = probe.parse(list);
            assert_eq!(from_list.len(), 1, "{}", probe.label());
            assert_eq!(from_list[0].model, "Intel(R) UHD Graphics 770");
        }
    }
}

use super::ProbeOutcome;
use crate::consts::*;
use crate::runtime::CommandRunner;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// How `CUDA_VISIBLE_DEVICES` restricts which GPU counts as device 0.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSelector {
    /// Variable unset: first GPU in `nvidia-smi` (PCI bus) order. Matches
    /// CUDA only under `CUDA_DEVICE_ORDER=PCI_BUS_ID` or on single-model hosts.
    Default,
    /// First visible entry, index or UUID.
    Id(String),
    /// Set to empty or `-1`: CUDA sees no devices.
    Hidden,
}

impl DeviceSelector {
    pub fn from_visible_devices(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return DeviceSelector::Default;
        };
        match value.split(',').next().map(str::trim) {
            Some("") | Some("-1") | None => DeviceSelector::Hidden,
            Some(first) => DeviceSelector::Id(first.to_string()),
        }
    }
}

pub struct HardwareCollector {
    sys: System,
}

impl HardwareCollector {
    pub fn new() -> Self {
        Self {
            sys: System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new())),
        }
    }

    /// OS family and kernel release, e.g. `Linux 6.8.0-45-generic`.
    pub fn os(&self) -> String {
        match System::kernel_version() {
            Some(release) => format!("{} {}", os_family(), release.trim()),
            None => os_family().to_string(),
        }
    }

    pub fn cpu(&self) -> String {
        self.sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string())
    }

    pub async fn cuda_version<R: CommandRunner>(&self, runner: &R, nvcc: &str) -> ProbeOutcome {
        let output = match runner.run(nvcc, &["--version"]).await {
            Ok(output) => output,
            Err(e) => {
                log::debug!("CUDA toolkit probe failed: {}", e);
                return e.into();
            }
        };

        match parse_release_version(&output) {
            Some(version) => ProbeOutcome::Found(version),
            None => {
                log::debug!("Unrecognised {} output: {:?}", nvcc, output);
                ProbeOutcome::Failed(format!("no `release <version>,` in {} output", nvcc))
            }
        }
    }

    /// Name of the GPU CUDA would expose as device 0.
    pub async fn gpu_name<R: CommandRunner>(
        &self,
        runner: &R,
        nvidia_smi: &str,
        selector: &DeviceSelector,
    ) -> ProbeOutcome {
        let id_arg;
        let mut args = vec!["--query-gpu=name", "--format=csv,noheader"];
        match selector {
            DeviceSelector::Hidden => {
                return ProbeOutcome::Failed(format!("{} hides every device", CUDA_VISIBLE_DEVICES));
            }
            DeviceSelector::Id(id) => {
                id_arg = format!("--id={}", id);
                args.push(&id_arg);
            }
            DeviceSelector::Default => {}
        }

        match runner.run(nvidia_smi, &args).await {
            Ok(output) => match output.lines().map(str::trim).find(|l| !l.is_empty()) {
                Some(name) => ProbeOutcome::Found(name.to_string()),
                None => ProbeOutcome::Failed(format!("{} listed no GPUs", nvidia_smi)),
            },
            Err(e) => {
                log::debug!("GPU probe failed: {}", e);
                e.into()
            }
        }
    }
}

/// Extracts the version between the last `release ` marker and the
/// following comma, e.g. `11.8` from `Cuda compilation tools, release 11.8, V11.8.89`.
pub fn parse_release_version(output: &str) -> Option<String> {
    let start = output.rfind(NVCC_RELEASE_MARKER)? + NVCC_RELEASE_MARKER.len();
    let rest = &output[start..];
    let end = rest.find(NVCC_RELEASE_TERMINATOR)?;
    let version = rest[..end].trim();
    (!version.is_empty()).then(|| version.to_string())
}

/// Same naming as Python's `platform.system()`.
fn os_family() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

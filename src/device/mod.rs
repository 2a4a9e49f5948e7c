use crate::config::ReporterConfig;
use crate::consts::*;
use crate::runtime::{CommandRunner, ProbeError};
use serde::Serialize;

pub use hardware::{DeviceSelector, HardwareCollector};
pub use python::PythonCollector;
pub mod hardware;
pub mod python;

/// Result of a single best-effort probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Found(String),
    /// The program or package does not exist.
    NotInstalled,
    /// The tool exists but its answer could not be used.
    Failed(String),
}

impl ProbeOutcome {
    pub fn value_or(&self, sentinel: &str) -> String {
        match self {
            ProbeOutcome::Found(value) => value.clone(),
            ProbeOutcome::NotInstalled | ProbeOutcome::Failed(_) => sentinel.to_string(),
        }
    }
}

impl From<ProbeError> for ProbeOutcome {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::NotInstalled(_) => ProbeOutcome::NotInstalled,
            other => ProbeOutcome::Failed(other.to_string()),
        }
    }
}

impl From<Option<String>> for ProbeOutcome {
    fn from(value: Option<String>) -> Self {
        value.map_or(ProbeOutcome::NotInstalled, ProbeOutcome::Found)
    }
}

/// The environment section of a report. Field order is output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentInfo {
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "Python")]
    pub python: String,
    #[serde(rename = "Transformers")]
    pub transformers: String,
    #[serde(rename = "PyTorch")]
    pub pytorch: String,
    #[serde(rename = "CUDA")]
    pub cuda: String,
    #[serde(rename = "GPU")]
    pub gpu: String,
    #[serde(rename = "CPU")]
    pub cpu: String,
}

impl EnvironmentInfo {
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            (KEY_OS, self.os.as_str()),
            (KEY_PYTHON, self.python.as_str()),
            (KEY_TRANSFORMERS, self.transformers.as_str()),
            (KEY_PYTORCH, self.pytorch.as_str()),
            (KEY_CUDA, self.cuda.as_str()),
            (KEY_GPU, self.gpu.as_str()),
            (KEY_CPU, self.cpu.as_str()),
        ]
    }
}

/// Raw outcome of each subprocess probe, kept for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeDetails {
    pub python: ProbeOutcome,
    pub transformers: ProbeOutcome,
    pub torch: ProbeOutcome,
    pub cuda: ProbeOutcome,
    pub gpu: ProbeOutcome,
}

#[derive(Debug, Clone)]
pub struct CollectedEnvironment {
    pub info: EnvironmentInfo,
    pub probes: ProbeDetails,
}

pub struct EnvironmentCollector<'a, R> {
    runner: &'a R,
    config: &'a ReporterConfig,
    cuda_visible_devices: Option<&'a str>,
}

impl<'a, R: CommandRunner> EnvironmentCollector<'a, R> {
    pub fn new(
        runner: &'a R,
        config: &'a ReporterConfig,
        cuda_visible_devices: Option<&'a str>,
    ) -> Self {
        Self {
            runner,
            config,
            cuda_visible_devices,
        }
    }

    pub async fn collect(&self) -> CollectedEnvironment {
        let hardware = HardwareCollector::new();
        let python = PythonCollector::new(self.config.python.as_deref());
        let selector = DeviceSelector::from_visible_devices(self.cuda_visible_devices);

        // 子进程探测互不依赖，并发执行
        let (runtime, cuda, gpu) = tokio::join!(
            python.collect(self.runner),
            hardware.cuda_version(self.runner, &self.config.nvcc),
            hardware.gpu_name(self.runner, &self.config.nvidia_smi, &selector),
        );

        let info = EnvironmentInfo {
            os: hardware.os(),
            python: runtime.python.value_or(NOT_FOUND),
            transformers: runtime.transformers.value_or(NOT_FOUND),
            pytorch: runtime.torch.value_or(NOT_FOUND),
            cuda: cuda.value_or(NOT_FOUND),
            gpu: gpu.value_or(NOT_AVAILABLE),
            cpu: hardware.cpu(),
        };

        CollectedEnvironment {
            info,
            probes: ProbeDetails {
                python: runtime.python,
                transformers: runtime.transformers,
                torch: runtime.torch,
                cuda,
                gpu,
            },
        }
    }
}

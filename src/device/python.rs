use super::ProbeOutcome;
use crate::consts::*;
use crate::runtime::{CommandRunner, ProbeError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PythonMetadata {
    python: String,
    transformers: Option<String>,
    torch: Option<String>,
}

/// Interpreter and ML framework versions.
#[derive(Debug, Clone, PartialEq)]
pub struct PythonRuntime {
    pub python: ProbeOutcome,
    pub transformers: ProbeOutcome,
    pub torch: ProbeOutcome,
}

impl PythonRuntime {
    fn uniform(outcome: ProbeOutcome) -> Self {
        Self {
            python: outcome.clone(),
            transformers: outcome.clone(),
            torch: outcome,
        }
    }
}

pub struct PythonCollector {
    candidates: Vec<String>,
}

impl PythonCollector {
    /// A configured interpreter is the only one tried; otherwise the
    /// usual names are searched on `PATH`.
    pub fn new(configured: Option<&str>) -> Self {
        let candidates = match configured {
            Some(python) => vec![python.to_string()],
            None => PYTHON_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        };
        Self { candidates }
    }

    pub async fn collect<R: CommandRunner>(&self, runner: &R) -> PythonRuntime {
        // 前面的候选失败时继续尝试，只有全部失败才报告最后一个错误
        let mut last_failure = None;
        for python in &self.candidates {
            match runner.run(python, &["-c", PYTHON_PROBE_SCRIPT]).await {
                Ok(output) => return parse_metadata(python, &output),
                Err(ProbeError::NotInstalled(_)) => {
                    log::debug!("Python interpreter {} not found", python);
                }
                Err(e) => {
                    log::debug!("Python probe with {} failed: {}", python, e);
                    last_failure = Some(ProbeOutcome::from(e));
                }
            }
        }
        PythonRuntime::uniform(last_failure.unwrap_or(ProbeOutcome::NotInstalled))
    }
}

fn parse_metadata(python: &str, output: &str) -> PythonRuntime {
    // 只取最后一行，忽略 sitecustomize 等可能打印的内容
    let line = output.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    match serde_json::from_str::<PythonMetadata>(line) {
        Ok(meta) => {
            log::info!("Using {} (Python {})", python, meta.python);
            PythonRuntime {
                python: ProbeOutcome::Found(meta.python),
                transformers: meta.transformers.into(),
                torch: meta.torch.into(),
            }
        }
        Err(e) => {
            log::debug!("Unrecognised {} probe output {:?}: {}", python, output, e);
            PythonRuntime::uniform(ProbeOutcome::Failed(format!(
                "unexpected output from {}: {}",
                python, e
            )))
        }
    }
}

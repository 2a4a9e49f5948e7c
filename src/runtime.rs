use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is not installed or not on PATH")]
    NotInstalled(String),
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: String },
    #[error("{0} produced output that is not valid UTF-8")]
    InvalidUtf8(String),
}

/// Runs an external program and returns its captured stdout.
///
/// Probes only talk to the host through this trait so they can be driven
/// by scripted output in tests.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;
}

/// Runs programs resolved from `PATH` with an optional timeout.
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// `timeout_secs == 0` waits for the child forever.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let path =
            which::which(program).map_err(|_| ProbeError::NotInstalled(program.to_string()))?;
        log::debug!("Running {} {:?}", path.display(), args);

        let child = Command::new(&path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| ProbeError::Timeout {
                    program: program.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => child.await,
        };

        let output = result.map_err(|e| ProbeError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            log::debug!(
                "{} stderr: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(ProbeError::NonZeroExit {
                program: program.to_string(),
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ProbeError::InvalidUtf8(program.to_string()))
    }
}

#[cfg(test)]
pub mod testing {
    use super::{CommandRunner, ProbeError};
    use std::collections::HashMap;

    /// Replays canned responses keyed by `program arg1 arg2 ...`.
    /// Anything not scripted behaves like a missing program.
    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: HashMap<String, Result<String, ProbeError>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ok(mut self, command: &str, stdout: &str) -> Self {
            self.responses
                .insert(command.to_string(), Ok(stdout.to_string()));
            self
        }

        pub fn err(mut self, command: &str, error: ProbeError) -> Self {
            self.responses.insert(command.to_string(), Err(error));
            self
        }
    }

    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
            let mut key = program.to_string();
            for arg in args {
                key.push(' ');
                key.push_str(arg);
            }
            self.responses
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(ProbeError::NotInstalled(program.to_string())))
        }
    }
}

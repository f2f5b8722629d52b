//! capability interface for the container runtime and its cli-backed implementation
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use crate::settings::Settings;

/// why a restart invocation failed
///
/// Carried inside [RestartOutcome] and consumed only by the logging and
/// metrics sinks; never returned to the webhook caller.
#[derive(Clone, Debug, Error)]
pub enum InvocationError {
    #[error("could not start `{binary} restart {target}`: {message}")]
    Spawn {
        binary: String,
        target: String,
        message: String,
    },
    #[error("`{binary} restart {target}` exited with {code}")]
    NonZeroExit {
        binary: String,
        target: String,
        /// formatted exit status, the raw code is unavailable when the
        /// process was killed by a signal
        code: String,
    },
}

/// result of a single restart invocation
#[derive(Clone, Debug)]
pub struct RestartOutcome {
    pub target: String,
    pub success: bool,
    /// captured stdout and stderr of the restart command
    pub combined_output: String,
    pub error: Option<InvocationError>,
}

/// something that can restart a named container
///
/// Abstracts over the concrete mechanism (shelling to a cli, talking to a
/// runtime api) so the dispatcher is testable without a container runtime.
#[async_trait]
pub trait ContainerManager: Send + Sync + 'static {
    /// restart the container named `target`, blocking the calling task
    /// until the operation finishes
    ///
    /// Never returns `Err`: operational failures are reported through
    /// `success` and `error` on the outcome. No timeout is imposed.
    async fn restart(&self, target: &str) -> RestartOutcome;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerRuntimeSettings {
    /// cli binary used to issue restarts, e.g. `docker` or `podman`
    pub binary: String,
}

impl ContainerRuntimeSettings {
    pub fn global() -> &'static Self {
        &Settings::global().container_runtime
    }
}

/// [ContainerManager] that shells out to `<binary> restart <target>`
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }

    fn outcome(&self, target: &str, result: std::io::Result<Output>) -> RestartOutcome {
        match result {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));

                let error = if output.status.success() {
                    None
                } else {
                    Some(InvocationError::NonZeroExit {
                        binary: self.binary.clone(),
                        target: target.to_string(),
                        code: output.status.to_string(),
                    })
                };

                RestartOutcome {
                    target: target.to_string(),
                    success: error.is_none(),
                    combined_output: combined,
                    error,
                }
            }
            Err(err) => RestartOutcome {
                target: target.to_string(),
                success: false,
                combined_output: String::new(),
                error: Some(InvocationError::Spawn {
                    binary: self.binary.clone(),
                    target: target.to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }
}

#[async_trait]
impl ContainerManager for DockerCli {
    async fn restart(&self, target: &str) -> RestartOutcome {
        let result = Command::new(&self.binary)
            .arg("restart")
            .arg(target)
            .output()
            .await;

        self.outcome(target, result)
    }
}

/// test double shared by the dispatcher and webhook receiver tests
#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{ContainerManager, InvocationError, RestartOutcome};

    /// records restart targets in call order; fails targets listed in `failing`
    pub struct RecordingManager {
        calls: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl RecordingManager {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                failing: Vec::new(),
            })
        }

        pub fn failing_on(target: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                failing: vec![target.to_string()],
            })
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContainerManager for RecordingManager {
        async fn restart(&self, target: &str) -> RestartOutcome {
            self.calls.lock().unwrap().push(target.to_string());

            let failed = self.failing.iter().any(|t| t == target);
            RestartOutcome {
                target: target.to_string(),
                success: !failed,
                combined_output: String::new(),
                error: failed.then(|| InvocationError::NonZeroExit {
                    binary: "docker".to_string(),
                    target: target.to_string(),
                    code: "exit status: 1".to_string(),
                }),
            }
        }
    }
}

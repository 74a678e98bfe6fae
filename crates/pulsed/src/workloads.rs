//! Workload backend — where scale and throttle requests end up.
//!
//! The decision loop never waits on the backend. Failures are logged by
//! the orchestrator and do not change the recorded decisions.

use std::sync::Mutex;

use tracing::info;

use pulse_core::{ContainerStatus, ThrottleLevel};

/// Backend that applies container and resource changes.
pub trait Workloads: Send + Sync {
    /// Move a deployment to the target container state.
    fn scale(&self, deployment: &str, target: ContainerStatus) -> anyhow::Result<()>;

    /// Apply a resource throttle level to a deployment.
    fn throttle(&self, deployment: &str, level: ThrottleLevel) -> anyhow::Result<()>;
}

/// A request seen by [`SimulatedWorkloads`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadCall {
    Scale {
        deployment: String,
        target: ContainerStatus,
    },
    Throttle {
        deployment: String,
        level: ThrottleLevel,
    },
}

/// In-process backend that logs and records every request.
#[derive(Default)]
pub struct SimulatedWorkloads {
    calls: Mutex<Vec<WorkloadCall>>,
}

impl SimulatedWorkloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<WorkloadCall> {
        self.calls.lock().expect("workloads lock").clone()
    }

    pub fn throttle_level(&self, deployment: &str) -> Option<ThrottleLevel> {
        self.calls
            .lock()
            .expect("workloads lock")
            .iter()
            .rev()
            .find_map(|call| match call {
                WorkloadCall::Throttle { deployment: d, level } if d == deployment => Some(*level),
                _ => None,
            })
    }
}

impl Workloads for SimulatedWorkloads {
    fn scale(&self, deployment: &str, target: ContainerStatus) -> anyhow::Result<()> {
        info!(%deployment, %target, "simulated scale");
        self.calls.lock().expect("workloads lock").push(WorkloadCall::Scale {
            deployment: deployment.to_string(),
            target,
        });
        Ok(())
    }

    fn throttle(&self, deployment: &str, level: ThrottleLevel) -> anyhow::Result<()> {
        info!(%deployment, %level, "simulated throttle");
        self.calls.lock().expect("workloads lock").push(WorkloadCall::Throttle {
            deployment: deployment.to_string(),
            level,
        });
        Ok(())
    }
}

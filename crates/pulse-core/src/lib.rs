//! pulse-core — shared vocabulary for the PulseGrid decision loop.
//!
//! The scorer, rules engine, telemetry subsystem and daemon never share
//! internal state; they exchange the plain data types defined here.

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod session;
pub mod throttle;
pub mod types;

pub use clock::{epoch_millis, system_clock, Clock};
pub use config::{DaemonConfig, EngineConfig, PulseConfig, ScorerConfig, TelemetryConfig};
pub use decision::{ActionType, AiDecision, TriggerType};
pub use error::{PulseError, PulseResult};
pub use session::UserSession;
pub use throttle::{ResourceAllocation, ThrottleAssignment, ThrottleLevel, ThrottlePlan};
pub use types::*;

//! pulsegrid-rules — the decision half of the PulseGrid loop.
//!
//! Consumes score updates, focus events, trend spikes, scroll updates and
//! the initial catalogue load, and turns them into [`AiDecision`]s. The
//! engine holds only configuration; every effect leaves through a
//! callback and per-user state lives in the caller's `UserSession`.
//!
//! # Rules
//!
//! ```text
//! score update:  combined >= hot  && state != HOT   -> SCALE_HOT
//!                combined >= warm && state == COLD  -> SCALE_WARM
//! trend spike:   viral >= swarm  && state == COLD   -> SWARM_BOOST / SCALE_WARM
//! focus event:   duration >= cross-domain           -> inject first same-theme,
//!                                                      other-type item (once per session)
//!                combined >= warm && state == COLD  -> PROACTIVE_WARM / SCALE_WARM
//!                duration >= mode focus             -> MODE_CHANGE (+ throttle plan)
//! ```
//!
//! [`AiDecision`]: pulse_core::AiDecision

pub mod decision_log;
pub mod engine;

pub use decision_log::DecisionLog;
pub use engine::{
    DecisionCallback, InjectCallback, ModeChangeCallback, RulesEngine, ScaleCallback,
    ThrottleCallback,
};

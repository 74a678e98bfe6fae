//! pulsegrid-telemetry — activation timelines and proof signals.
//!
//! Two independent trackers observe the same activation lifecycle:
//!
//! - [`ActivationSpine`] records qualitative phases (INTENT, PRE_WARM,
//!   HOT, ...) per content item for human-facing timelines.
//! - [`ProofSignalManager`] stamps metric-grade checkpoints for one
//!   attempt at a time per content item and derives latencies plus an
//!   activation path classification.
//!
//! ```text
//! NEW → INTENT → DECISION → (PREWARM_START → WARM_READY)?
//!     → ACTIVATION_REQUEST → HOT_ENTERED → EXECUTION_READY
//!                          ↘ RESTORE_START → RESTORE_COMPLETE
//! ```

pub mod proof;
pub mod spine;

pub use proof::{
    ActivationPathType, AttemptState, ProofEventType, ProofSignalEvent, ProofSignalManager,
    SignalCallback, SnapshotCallback, TelemetrySnapshot,
};
pub use spine::{
    ActivationPhase, ActivationSpine, ActivationSpineEvent, ContentTimeline, PhaseCallback,
    ResourceWeight,
};

//! pulsed — the PulseGrid orchestrating daemon.
//!
//! Owns everything the decision core treats as an external collaborator:
//! the content registry, per-client sessions, the outbound event hub,
//! and the workload backend. [`Orchestrator`] wires the scorer, rules
//! engine, activation spine, and proof signal manager together through
//! their callbacks once at construction.

pub mod events;
pub mod hub;
pub mod orchestrator;
pub mod registry;
pub mod sessions;
pub mod simulate;
pub mod workloads;

pub use events::{ClientEnvelope, ClientEvent, DemoAction, ServerEvent};
pub use hub::{Hub, Outbound};
pub use orchestrator::Orchestrator;
pub use registry::{default_catalogue, ContentRegistry};
pub use sessions::SessionTable;
pub use workloads::{SimulatedWorkloads, WorkloadCall, Workloads};

//! pulsegrid-state — optional persistent mirror of decision-loop state.
//!
//! Backed by [redb](https://docs.rs/redb). Scores, trend data, and the
//! recent decision history are mirrored here so other processes can
//! read them; nothing in the decision loop reads the mirror back.
//!
//! Values are JSON-serialized into `&[u8]` columns. Score keys are
//! `{session_id}:{content_id}`, decision keys sort chronologically.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::{StateStore, DECISION_HISTORY_LIMIT};

//! Wall-clock source shared by components that stamp time.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time as Unix milliseconds.
///
/// Components take a `Clock` instead of calling the system clock
/// directly so tests can drive time explicitly.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// The real system clock.
pub fn system_clock() -> Clock {
    Arc::new(epoch_millis)
}

pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

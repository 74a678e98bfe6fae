//! Simulated container start-up latency.

use std::time::Duration;

use rand::Rng;

use pulse_core::ContentType;

/// Jittered time for a container to become preview-ready.
pub fn startup_delay(content_type: &ContentType) -> Duration {
    let ms = match content_type {
        ContentType::AiService => rand::thread_rng().gen_range(800..1200),
        ContentType::Game | ContentType::Other(_) => rand::thread_rng().gen_range(1500..2500),
    };
    Duration::from_millis(ms)
}

/// Jittered time to restore a recently hot container.
pub fn restore_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(200..500))
}

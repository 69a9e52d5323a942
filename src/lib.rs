// Library exports for integration tests and reusable components

pub mod config;
pub mod playback;

pub use config::{ConfigError, PlaybackConfig};

// Test support (only available with test-utils feature)
#[cfg(feature = "test-utils")]
pub mod test_support;

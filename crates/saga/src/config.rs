//! Event processor configuration loaded from environment variables.

/// Event processor configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `SAGA_MAX_IN_FLIGHT`: events processed concurrently (default: `16`)
/// - `SAGA_CHANNEL_CAPACITY`: buffered events before senders wait (default: `256`)
///
/// Zero or unparsable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub max_in_flight: usize,
    pub channel_capacity: usize,
}

const DEFAULT_MAX_IN_FLIGHT: usize = 16;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl ProcessorConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(default)
        };
        Self {
            max_in_flight: positive("SAGA_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT),
            channel_capacity: positive("SAGA_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

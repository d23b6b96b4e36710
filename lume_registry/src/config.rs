use lume_core::KeyFormat;
use serde::{Deserialize, Serialize};

/// Default capacity of the channel carrying observed CREATED/RESPONSE frames.
pub const DEFAULT_OBSERVED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How entry public keys map to ed25519 verifying keys.
    #[serde(default)]
    pub key_format: KeyFormat,
    /// Capacity of the observed frame channel; slow subscribers lag
    /// and miss frames beyond this.
    #[serde(default = "default_observed_capacity")]
    pub observed_capacity: usize,
}

fn default_observed_capacity() -> usize {
    DEFAULT_OBSERVED_CAPACITY
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            key_format: KeyFormat::default(),
            observed_capacity: DEFAULT_OBSERVED_CAPACITY,
        }
    }
}

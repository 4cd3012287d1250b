use std::path::Path;
use std::time::Duration;

use relaybridge_frame::ChannelConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PeerError, Result};

/// Adapter configuration.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// User channels, registered after the built-in defaults.
    pub channels: Vec<ChannelConfig>,
    /// Raw relay events dispatched per socket on each `poll`.
    pub max_messages_per_pump: usize,
    /// Delay between relay network initialization retries.
    pub init_retry_interval_ms: u64,
    /// How often the host should call `maintain`.
    pub maintenance_interval_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            max_messages_per_pump: 256,
            init_retry_interval_ms: 1000,
            maintenance_interval_ms: 100,
        }
    }
}

impl AdapterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the adapter cannot run with.
    ///
    /// A pump budget of zero would keep `poll` from ever dispatching relay
    /// events.
    pub fn validate(&self) -> Result<()> {
        if self.max_messages_per_pump == 0 {
            return Err(PeerError::InvalidConfig(
                "max_messages_per_pump must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PeerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Add a user channel.
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn init_retry_interval(&self) -> Duration {
        Duration::from_millis(self.init_retry_interval_ms)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms)
    }
}

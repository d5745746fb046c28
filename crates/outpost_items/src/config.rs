//! Item service configuration

use serde::{Deserialize, Serialize};

/// Radio router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Maximum number of channels one `radio_send_text` call dispatches on
    pub max_send_channels: usize,

    /// Width of one global-map zone in world units
    pub zone_length: u16,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            max_send_channels: 100,
            zone_length: 50,
        }
    }
}

/// Item manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemManagerConfig {
    /// Cap on discrete (non-stackable) instances created by one bulk add
    pub max_added_nogroup_items: u32,

    /// Radio router settings
    pub radio: RadioConfig,
}

impl Default for ItemManagerConfig {
    fn default() -> Self {
        Self {
            max_added_nogroup_items: 1000,
            radio: RadioConfig::default(),
        }
    }
}

impl ItemManagerConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the discrete-instance cap
    pub fn with_max_added_nogroup_items(mut self, max: u32) -> Self {
        self.max_added_nogroup_items = max;
        self
    }

    /// Set the per-call channel cap for radio sends
    pub fn with_max_send_channels(mut self, max: usize) -> Self {
        self.radio.max_send_channels = max;
        self
    }

    /// Set the global-map zone width
    pub fn with_zone_length(mut self, length: u16) -> Self {
        self.radio.zone_length = length.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ItemManagerConfig::default();
        assert_eq!(config.max_added_nogroup_items, 1000);
        assert_eq!(config.radio.max_send_channels, 100);
        assert_eq!(config.radio.zone_length, 50);
    }

    #[test]
    fn test_partial_json() {
        let config = ItemManagerConfig::from_json(r#"{ "radio": { "zone_length": 25 } }"#).unwrap();
        assert_eq!(config.radio.zone_length, 25);
        assert_eq!(config.radio.max_send_channels, 100);
        assert_eq!(config.max_added_nogroup_items, 1000);
    }

    #[test]
    fn test_builders() {
        let config = ItemManagerConfig::default()
            .with_max_added_nogroup_items(3)
            .with_zone_length(0);
        assert_eq!(config.max_added_nogroup_items, 3);
        assert_eq!(config.radio.zone_length, 1);
    }
}

use crate::media::{MediaConstraints, SubstituteVideoConfig};
use crate::transport::TransportConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub transport: TransportConfig,
    /// Whether an existing member offers to a newcomer on `user-joined`.
    /// Glare between the two offers is resolved by id ordering.
    pub initiate_on_member_joined: bool,
    /// How long a session may sit in `HaveLocalOffer` before it is closed.
    pub negotiation_timeout_ms: Option<u64>,
    pub media: MediaConfig,
    pub event_capacity: usize,
}

impl RoomConfig {
    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            initiate_on_member_joined: true,
            negotiation_timeout_ms: Some(15_000),
            media: MediaConfig::default(),
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub capture: MediaConstraints,
    pub substitute: SubstituteVideoConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayClientConfig {
    pub url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl RelayClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000/ws".to_owned(),
            reconnect_attempts: 5,
            reconnect_delay_ms: 1_000,
        }
    }
}

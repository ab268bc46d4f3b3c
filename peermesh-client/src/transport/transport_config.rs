use peermesh_core::IceServerConfig;
use peermesh_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::Deserialize;

/// WebRTC connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

impl TransportConfig {
    /// No ICE servers: host candidates only. Used for loopback tests.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}

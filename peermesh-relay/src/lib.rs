//! Reference relay for the peermesh signaling channel.
//!
//! Tracks room membership and forwards `offer`/`answer`/`ice-candidate`
//! messages between members. It never looks inside them.

pub mod config;
pub mod signaling;

pub use config::RelayConfig;
pub use signaling::{RelayService, router, ws_handler};

pub use peermesh_core::{PeerId, RoomId};

pub mod model {
    pub use peermesh_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use peermesh_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use peermesh_relay::*;
}

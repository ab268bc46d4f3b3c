pub mod model;
pub mod utils;

pub use model::{
    ClientSignal, IceCandidate, IceServerConfig, PeerId, RelaySignal, RoomId, SdpType,
    SessionDescription,
};

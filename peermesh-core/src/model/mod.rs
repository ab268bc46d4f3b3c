mod ice;
mod peer;
mod room;
mod session_description;
mod signaling;

pub use ice::IceCandidate;
pub use peer::PeerId;
pub use room::RoomId;
pub use session_description::{SdpType, SessionDescription};
pub use signaling::{ClientSignal, IceServerConfig, RelaySignal};

//! Full-mesh peer session orchestration.
//!
//! A [`RoomCoordinator`] keeps exactly one negotiated connection per remote
//! room member, driven by membership and signaling events from a relay.
//! Applications talk to it through a [`RoomHandle`].

pub mod config;
pub mod error;
pub mod media;
pub mod room;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::{MediaConfig, RelayClientConfig, RoomConfig};
pub use error::{MediaError, NegotiationStage, RoomError};
pub use media::{
    ExternalMediaDevices, LocalTrack, MediaConstraints, MediaDevices, TrackKind, TrackSource,
    VideoConstraints,
};
pub use room::{
    NullRenderSurface, PeerSnapshot, RenderSurface, RoomCollaborators, RoomCoordinator,
    RoomHandle, RoomSnapshot, SessionStatus,
};
pub use session::{NegotiationState, SessionKey};
pub use signaling::{RelayEvent, RelayOutput, WsRelay};
pub use transport::{
    IceConnectionState, PeerConnection, PeerConnectionFactory, RemoteTrack, TransportConfig,
    TransportEvent, WebRtcConnectionFactory,
};

use crate::session::SessionKey;
use crate::transport::RemoteTrack;
use peermesh_core::IceCandidate;

/// Connection-level events reported by the platform for one session.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be trickled to the peer.
    CandidateGenerated(SessionKey, IceCandidate),

    /// The remote side started sending a media track.
    RemoteTrack(SessionKey, RemoteTrack),

    /// ICE connectivity changed.
    IceStateChanged(SessionKey, IceConnectionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

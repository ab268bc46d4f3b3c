use crate::media::{LocalTrack, TrackKind};
use crate::session::SessionKey;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use peermesh_core::{IceCandidate, SessionDescription};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_remote::TrackRemote;

/// The platform's point-to-point media connection.
///
/// Every suspending call may fail; a failure is a negotiation failure for
/// the owning session only. Implementations report asynchronous
/// notifications through the [`TransportEvent`] channel they were created with.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swap the track on the existing sender of the same kind.
    /// Returns `false` when the connection has no sender of that kind.
    async fn replace_track(&self, track: &LocalTrack) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

/// Creates one [`PeerConnection`] per session.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        key: SessionKey,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>>;
}

/// A track the remote peer is sending us.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    /// The live RTP track when the connection is backed by webrtc-rs.
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

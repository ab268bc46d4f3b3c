use crate::error::RoomError;
use crate::media::LocalTrack;
use crate::transport::RemoteTrack;
use async_trait::async_trait;
use peermesh_core::PeerId;

/// Where media and user-visible errors end up (a UI, a recorder, a test).
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// The local stream changed; empty when local media was cleared.
    async fn on_local_stream(&self, tracks: Vec<LocalTrack>);

    async fn on_remote_track(&self, peer_id: PeerId, track: RemoteTrack);

    /// Revoke everything shown for `peer_id`.
    async fn on_peer_removed(&self, peer_id: PeerId);

    async fn on_error(&self, error: &RoomError);
}

/// Discards everything. For headless participants.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderSurface;

#[async_trait]
impl RenderSurface for NullRenderSurface {
    async fn on_local_stream(&self, _tracks: Vec<LocalTrack>) {}

    async fn on_remote_track(&self, _peer_id: PeerId, _track: RemoteTrack) {}

    async fn on_peer_removed(&self, _peer_id: PeerId) {}

    async fn on_error(&self, _error: &RoomError) {}
}

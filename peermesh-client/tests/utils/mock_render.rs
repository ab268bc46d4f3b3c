use async_trait::async_trait;
use peermesh_client::{LocalTrack, RemoteTrack, RenderSurface, RoomError, TrackKind, TrackSource};
use peermesh_core::PeerId;
use std::sync::Mutex;

/// Event types that can be recorded by [`MockRender`].
#[derive(Debug, Clone)]
pub enum RenderEvent {
    /// The local stream changed. One `(kind, source, id)` per track.
    LocalStream(Vec<(TrackKind, TrackSource, String)>),
    RemoteTrack { peer_id: PeerId, kind: TrackKind },
    PeerRemoved(PeerId),
    Error(RoomError),
}

/// A render surface that records everything it is shown.
#[derive(Default)]
pub struct MockRender {
    events: Mutex<Vec<RenderEvent>>,
}

impl MockRender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<RoomError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<PeerId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::PeerRemoved(peer_id) => Some(peer_id),
                _ => None,
            })
            .collect()
    }

    pub fn was_removed(&self, peer: &str) -> bool {
        self.removed().contains(&PeerId::from(peer))
    }

    pub fn remote_tracks_from(&self, peer: &str) -> usize {
        let peer = PeerId::from(peer);
        self.events()
            .iter()
            .filter(|e| matches!(e, RenderEvent::RemoteTrack { peer_id, .. } if *peer_id == peer))
            .count()
    }

    /// The most recently published local stream.
    pub fn local_stream(&self) -> Option<Vec<(TrackKind, TrackSource, String)>> {
        self.events().into_iter().rev().find_map(|e| match e {
            RenderEvent::LocalStream(tracks) => Some(tracks),
            _ => None,
        })
    }

    fn record(&self, event: RenderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl RenderSurface for MockRender {
    async fn on_local_stream(&self, tracks: Vec<LocalTrack>) {
        let tracks = tracks
            .iter()
            .map(|t| (t.kind(), t.source(), t.id().to_owned()))
            .collect();
        self.record(RenderEvent::LocalStream(tracks));
    }

    async fn on_remote_track(&self, peer_id: PeerId, track: RemoteTrack) {
        self.record(RenderEvent::RemoteTrack {
            peer_id,
            kind: track.kind,
        });
    }

    async fn on_peer_removed(&self, peer_id: PeerId) {
        self.record(RenderEvent::PeerRemoved(peer_id));
    }

    async fn on_error(&self, error: &RoomError) {
        self.record(RenderEvent::Error(error.clone()));
    }
}

use anyhow::{Result, bail};
use async_trait::async_trait;
use peermesh_client::{
    IceConnectionState, LocalTrack, PeerConnection, PeerConnectionFactory, RemoteTrack, SessionKey,
    TrackKind, TrackSource, TransportEvent,
};
use peermesh_core::{IceCandidate, PeerId, SdpType, SessionDescription};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One platform call made on a [`MockPeerConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    AddCandidate(String),
    AddTrack { kind: TrackKind, source: TrackSource, id: String },
    ReplaceTrack { kind: TrackKind, source: TrackSource, id: String },
    Close,
}

/// Platform steps that can be made to fail for a given peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Create,
    CreateOffer,
    CreateAnswer,
    SetRemote,
    /// `close` never completes.
    StallClose,
}

/// A connection that accepts any description and records every call.
///
/// Each successful `set_local_description` gathers `candidates_per_description`
/// local candidates, and each remote offer or answer announces one remote
/// video track.
pub struct MockPeerConnection {
    key: SessionKey,
    events: mpsc::Sender<TransportEvent>,
    calls: Mutex<Vec<ConnectionCall>>,
    senders: Mutex<HashSet<TrackKind>>,
    failures: HashSet<FailPoint>,
    candidates_per_description: usize,
}

impl MockPeerConnection {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn calls(&self) -> Vec<ConnectionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &ConnectionCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&ConnectionCall::Close)
    }

    /// Position of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&ConnectionCall) -> bool) -> Option<usize> {
        self.calls().iter().position(pred)
    }

    /// The last track swapped in for `kind`.
    pub fn last_replaced(&self, kind: TrackKind) -> Option<(TrackSource, String)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            ConnectionCall::ReplaceTrack {
                kind: k,
                source,
                id,
            } if k == kind => Some((source, id)),
            _ => None,
        })
    }

    /// Report an ICE state change, as the platform would.
    pub async fn emit_ice(&self, state: IceConnectionState) {
        let _ = self
            .events
            .send(TransportEvent::IceStateChanged(self.key.clone(), state))
            .await;
    }

    fn record(&self, call: ConnectionCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.failures.contains(&point) {
            bail!("injected {:?} failure for {}", point, self.key);
        }
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateOffer);
        self.check(FailPoint::CreateOffer)?;
        Ok(SessionDescription::offer(format!("v=0 offer {}", self.key)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateAnswer);
        self.check(FailPoint::CreateAnswer)?;
        Ok(SessionDescription::answer(format!("v=0 answer {}", self.key)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(ConnectionCall::SetLocal(desc.sdp_type));
        for n in 0..self.candidates_per_description {
            let candidate = IceCandidate::new(format!(
                "candidate:{n} 1 udp 2122260223 10.0.0.1 {} typ host",
                5000 + n
            ));
            let _ = self
                .events
                .send(TransportEvent::CandidateGenerated(self.key.clone(), candidate))
                .await;
        }
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(ConnectionCall::SetRemote(desc.sdp_type));
        self.check(FailPoint::SetRemote)?;
        let track = RemoteTrack {
            id: format!("remote-video-{}", self.key),
            stream_id: self.key.peer_id.to_string(),
            kind: TrackKind::Video,
            track: None,
        };
        let _ = self
            .events
            .send(TransportEvent::RemoteTrack(self.key.clone(), track))
            .await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(ConnectionCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        self.senders.lock().unwrap().insert(track.kind());
        self.record(ConnectionCall::AddTrack {
            kind: track.kind(),
            source: track.source(),
            id: track.id().to_owned(),
        });
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<bool> {
        if !self.senders.lock().unwrap().contains(&track.kind()) {
            return Ok(false);
        }
        self.record(ConnectionCall::ReplaceTrack {
            kind: track.kind(),
            source: track.source(),
            id: track.id().to_owned(),
        });
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.record(ConnectionCall::Close);
        if self.failures.contains(&FailPoint::StallClose) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Creates [`MockPeerConnection`]s and keeps every one it created.
#[derive(Default)]
pub struct MockTransport {
    connections: Mutex<Vec<Arc<MockPeerConnection>>>,
    failures: Mutex<HashMap<PeerId, HashSet<FailPoint>>>,
    candidates_per_description: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather `count` local candidates after every local description.
    pub fn with_candidates(count: usize) -> Self {
        Self {
            candidates_per_description: count,
            ..Self::default()
        }
    }

    /// Make `point` fail for every connection to `peer_id` created from now on.
    pub fn fail(&self, peer_id: &str, point: FailPoint) {
        self.failures
            .lock()
            .unwrap()
            .entry(PeerId::from(peer_id))
            .or_default()
            .insert(point);
    }

    pub fn connections(&self) -> Vec<Arc<MockPeerConnection>> {
        self.connections.lock().unwrap().clone()
    }

    /// Most recent connection created for `peer_id`.
    pub fn connection(&self, peer_id: &str) -> Option<Arc<MockPeerConnection>> {
        let peer_id = PeerId::from(peer_id);
        self.connections()
            .into_iter()
            .rev()
            .find(|c| c.key.peer_id == peer_id)
    }

    pub fn created_for(&self, peer_id: &str) -> usize {
        let peer_id = PeerId::from(peer_id);
        self.connections()
            .iter()
            .filter(|c| c.key.peer_id == peer_id)
            .count()
    }
}

#[async_trait]
impl PeerConnectionFactory for MockTransport {
    async fn create(
        &self,
        key: SessionKey,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let failures = self
            .failures
            .lock()
            .unwrap()
            .get(&key.peer_id)
            .cloned()
            .unwrap_or_default();
        if failures.contains(&FailPoint::Create) {
            bail!("injected connection failure for {}", key);
        }

        let connection = Arc::new(MockPeerConnection {
            key,
            events,
            calls: Mutex::new(Vec::new()),
            senders: Mutex::new(HashSet::new()),
            failures,
            candidates_per_description: self.candidates_per_description,
        });
        self.connections.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

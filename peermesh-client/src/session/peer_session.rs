use crate::media::LocalTrack;
use crate::session::{
    CandidateBuffer, NegotiationEvent, NegotiationOp, NegotiationState, SignalingStateMachine,
    spawn_negotiator,
};
use crate::transport::{IceConnectionState, PeerConnection};
use peermesh_core::{IceCandidate, PeerId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Identifies one session incarnation. A peer that is removed and comes back
/// gets a new generation, so late completions for the old one are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub peer_id: PeerId,
    pub generation: u64,
}

impl SessionKey {
    pub fn new(peer_id: PeerId, generation: u64) -> Self {
        Self {
            peer_id,
            generation,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer_id, self.generation)
    }
}

/// One live connection to a remote peer.
pub struct PeerSession {
    key: SessionKey,
    connection: Arc<dyn PeerConnection>,
    pub(crate) signaling: SignalingStateMachine,
    pub(crate) candidates: CandidateBuffer,
    ops: mpsc::UnboundedSender<NegotiationOp>,
    worker: JoinHandle<()>,
    /// Local candidates wait here until our offer or answer went out.
    held_candidates: Vec<IceCandidate>,
    local_description_sent: bool,
    offer_timer: Option<JoinHandle<()>>,
    ice_state: IceConnectionState,
}

impl PeerSession {
    pub(crate) fn start(
        key: SessionKey,
        connection: Arc<dyn PeerConnection>,
        polite: bool,
        events: mpsc::UnboundedSender<NegotiationEvent>,
    ) -> Self {
        let (ops, worker) = spawn_negotiator(key.clone(), connection.clone(), events);
        Self {
            key,
            connection,
            signaling: SignalingStateMachine::new(polite),
            candidates: CandidateBuffer::new(),
            ops,
            worker,
            held_candidates: Vec::new(),
            local_description_sent: false,
            offer_timer: None,
            ice_state: IceConnectionState::New,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.key.peer_id
    }

    pub fn state(&self) -> NegotiationState {
        self.signaling.state()
    }

    pub fn ice_state(&self) -> IceConnectionState {
        self.ice_state
    }

    pub(crate) fn set_ice_state(&mut self, state: IceConnectionState) {
        self.ice_state = state;
    }

    pub(crate) fn enqueue(&self, op: NegotiationOp) {
        if self.ops.send(op).is_err() {
            warn!("Negotiator for {} is gone; dropping operation", self.key);
        }
    }

    pub(crate) fn attach(&self, tracks: &[LocalTrack]) {
        for track in tracks {
            self.enqueue(NegotiationOp::AttachTrack(track.clone()));
        }
    }

    /// Queue every buffered remote candidate behind the remote description.
    pub(crate) fn flush_candidates(&mut self) {
        for candidate in self.candidates.open() {
            self.enqueue(NegotiationOp::AddCandidate(candidate));
        }
    }

    /// Returns the candidate when it may be sent now.
    pub(crate) fn hold_or_release(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.local_description_sent {
            return Some(candidate);
        }
        self.held_candidates.push(candidate);
        None
    }

    /// Our offer or answer reached the relay; release held candidates.
    pub(crate) fn local_description_sent(&mut self) -> Vec<IceCandidate> {
        self.local_description_sent = true;
        std::mem::take(&mut self.held_candidates)
    }

    pub(crate) fn arm_offer_timer(
        &mut self,
        timeout: Duration,
        events: mpsc::UnboundedSender<NegotiationEvent>,
    ) {
        let key = self.key.clone();
        self.cancel_offer_timer();
        self.offer_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(NegotiationEvent::OfferTimeout { key });
        }));
    }

    pub(crate) fn cancel_offer_timer(&mut self) {
        if let Some(timer) = self.offer_timer.take() {
            timer.abort();
        }
    }

    /// Close the session. Outstanding platform work is abandoned and the
    /// connection is closed on its own task.
    pub(crate) fn close(mut self) {
        self.signaling.close();
        self.cancel_offer_timer();
        self.worker.abort();
        close_connection(self.key, self.connection);
    }

    /// Hand the buffered remote candidates to a replacement session.
    pub(crate) fn take_candidates(&mut self) -> CandidateBuffer {
        std::mem::take(&mut self.candidates)
    }
}

/// Close `connection` without waiting for the platform.
pub(crate) fn close_connection(key: SessionKey, connection: Arc<dyn PeerConnection>) {
    tokio::spawn(async move {
        if let Err(e) = connection.close().await {
            warn!("Failed to close connection for {}: {:?}", key, e);
        }
        debug!("Connection for {} closed", key);
    });
}

impl fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerSession")
            .field("key", &self.key)
            .field("state", &self.signaling.state())
            .field("buffered_candidates", &self.candidates.len())
            .field("ice_state", &self.ice_state)
            .finish()
    }
}

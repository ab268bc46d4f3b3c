use crate::error::{NegotiationStage, RoomError};
use crate::media::LocalTrack;
use crate::room::{PeerSnapshot, SessionStatus};
use crate::session::{
    CandidateBuffer, NegotiationEvent, NegotiationOp, NegotiationState, OfferDecision,
    PeerSession, SessionKey,
};
use super::peer_session::close_connection;
use crate::signaling::RelayOutput;
use crate::transport::{IceConnectionState, PeerConnection, PeerConnectionFactory, TransportEvent};
use anyhow::Result;
use peermesh_core::{IceCandidate, PeerId, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Returned by [`PeerSessionRegistry::ensure_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub key: SessionKey,
    /// `true` when this call started the creation.
    pub is_new: bool,
}

/// A session whose connection the platform is still constructing.
#[derive(Debug)]
struct PendingSession {
    key: SessionKey,
    initiate: bool,
    early_offer: Option<SessionDescription>,
    candidates: CandidateBuffer,
}

#[derive(Debug)]
enum SessionSlot {
    Pending(PendingSession),
    Live(PeerSession),
}

impl SessionSlot {
    fn key(&self) -> &SessionKey {
        match self {
            SessionSlot::Pending(pending) => &pending.key,
            SessionSlot::Live(session) => session.key(),
        }
    }
}

/// Owns every per-peer session of the room. At most one slot exists per
/// peer; all mutation goes through the methods below, called from the room
/// actor only.
pub struct PeerSessionRegistry {
    local_id: Option<PeerId>,
    slots: HashMap<PeerId, SessionSlot>,
    next_generation: u64,
    factory: Arc<dyn PeerConnectionFactory>,
    relay: Arc<dyn RelayOutput>,
    transport_tx: mpsc::Sender<TransportEvent>,
    negotiation_tx: mpsc::UnboundedSender<NegotiationEvent>,
    offer_timeout: Option<Duration>,
}

impl PeerSessionRegistry {
    pub fn new(
        factory: Arc<dyn PeerConnectionFactory>,
        relay: Arc<dyn RelayOutput>,
        transport_tx: mpsc::Sender<TransportEvent>,
        negotiation_tx: mpsc::UnboundedSender<NegotiationEvent>,
        offer_timeout: Option<Duration>,
    ) -> Self {
        Self {
            local_id: None,
            slots: HashMap::new(),
            next_generation: 0,
            factory,
            relay,
            transport_tx,
            negotiation_tx,
            offer_timeout,
        }
    }

    /// Set the local participant id used for the glare tie-break.
    pub fn bind(&mut self, local_id: PeerId) {
        self.local_id = Some(local_id);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.slots.contains_key(peer_id)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn session(&self, peer_id: &PeerId) -> Option<&PeerSession> {
        match self.slots.get(peer_id) {
            Some(SessionSlot::Live(session)) => Some(session),
            _ => None,
        }
    }

    /// Whether `key` is the current incarnation for its peer.
    pub fn is_current(&self, key: &SessionKey) -> bool {
        self.slots
            .get(&key.peer_id)
            .is_some_and(|slot| slot.key() == key)
    }

    fn live_mut(&mut self, key: &SessionKey) -> Option<&mut PeerSession> {
        match self.slots.get_mut(&key.peer_id) {
            Some(SessionSlot::Live(session)) if session.key() == key => Some(session),
            _ => None,
        }
    }

    /// Return the existing session for `peer_id`, or start creating one.
    /// Returns `None` while a creation for the peer is already in flight.
    pub fn ensure_session(&mut self, peer_id: &PeerId, initiate: bool) -> Option<SessionRef> {
        match self.slots.get(peer_id) {
            Some(SessionSlot::Pending(pending)) => {
                debug!("Session for {} is still being created", pending.key);
                return None;
            }
            Some(SessionSlot::Live(session)) => {
                return Some(SessionRef {
                    key: session.key().clone(),
                    is_new: false,
                });
            }
            None => {}
        }

        let key = self.create(peer_id, initiate, None, CandidateBuffer::new());
        Some(SessionRef { key, is_new: true })
    }

    /// Put a pending slot for `peer_id` in place and ask the platform for
    /// its connection.
    fn create(
        &mut self,
        peer_id: &PeerId,
        initiate: bool,
        early_offer: Option<SessionDescription>,
        candidates: CandidateBuffer,
    ) -> SessionKey {
        let key = SessionKey::new(peer_id.clone(), self.next_generation);
        self.next_generation += 1;
        info!("Creating session {} (initiate: {})", key, initiate);

        self.slots.insert(
            peer_id.clone(),
            SessionSlot::Pending(PendingSession {
                key: key.clone(),
                initiate,
                early_offer,
                candidates,
            }),
        );

        let factory = self.factory.clone();
        let transport_tx = self.transport_tx.clone();
        let events = self.negotiation_tx.clone();
        let create_key = key.clone();
        tokio::spawn(async move {
            let result = factory.create(create_key.clone(), transport_tx).await;
            let _ = events.send(NegotiationEvent::Created {
                key: create_key,
                result,
            });
        });
        key
    }

    /// The platform finished constructing a connection. Attaches `tracks`,
    /// starts the offer if the session initiates, and replays whatever
    /// arrived while it was pending.
    pub fn install(
        &mut self,
        key: SessionKey,
        result: Result<Arc<dyn PeerConnection>>,
        tracks: &[LocalTrack],
    ) -> Result<(), RoomError> {
        let is_pending =
            matches!(self.slots.get(&key.peer_id), Some(SessionSlot::Pending(p)) if p.key == key);
        if !is_pending {
            debug!("Discarding connection for replaced session {}", key);
            if let Ok(connection) = result {
                close_connection(key, connection);
            }
            return Ok(());
        }

        let Some(SessionSlot::Pending(pending)) = self.slots.remove(&key.peer_id) else {
            return Ok(());
        };

        let connection = match result {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to create connection for {}: {:?}", key, e);
                return Err(RoomError::Negotiation {
                    peer_id: key.peer_id,
                    stage: NegotiationStage::CreateConnection,
                    reason: format!("{e:#}"),
                });
            }
        };

        let polite = self
            .local_id
            .as_ref()
            .is_some_and(|local_id| *local_id < key.peer_id);
        let mut session = PeerSession::start(
            key.clone(),
            connection,
            polite,
            self.negotiation_tx.clone(),
        );
        session.candidates = pending.candidates;
        session.attach(tracks);

        if pending.initiate && session.signaling.begin_offer() {
            session.enqueue(NegotiationOp::CreateOffer);
        }
        info!("Session {} ready (polite: {})", key, polite);

        self.slots
            .insert(key.peer_id.clone(), SessionSlot::Live(session));

        if let Some(offer) = pending.early_offer {
            self.deliver_offer(&key.peer_id, offer);
        }
        Ok(())
    }

    /// Close and drop the session for `peer_id`. Returns whether one existed.
    pub fn remove(&mut self, peer_id: &PeerId) -> bool {
        match self.slots.remove(peer_id) {
            Some(SessionSlot::Live(session)) => {
                info!("Closing session {}", session.key());
                session.close();
                true
            }
            Some(SessionSlot::Pending(pending)) => {
                info!("Dropping pending session {}", pending.key);
                true
            }
            None => false,
        }
    }

    /// Remove every session. Returns the peers that had one.
    pub fn close_all(&mut self) -> Vec<PeerId> {
        let peers = self.peer_ids();
        for peer_id in &peers {
            self.remove(peer_id);
        }
        peers
    }

    /// Remote candidate from `from`.
    pub fn add_candidate(&mut self, from: &PeerId, candidate: IceCandidate) {
        match self.slots.get_mut(from) {
            Some(SessionSlot::Pending(pending)) => {
                pending.candidates.push(candidate);
            }
            Some(SessionSlot::Live(session)) => {
                if let Some(candidate) = session.candidates.push(candidate) {
                    session.enqueue(NegotiationOp::AddCandidate(candidate));
                } else {
                    debug!("Buffered ICE candidate for {}", session.key());
                }
            }
            None => warn!("Ignoring ICE candidate from unknown peer {}", from),
        }
    }

    pub fn deliver_offer(&mut self, from: &PeerId, offer: SessionDescription) {
        let session = match self.slots.get_mut(from) {
            Some(SessionSlot::Pending(pending)) => {
                if pending.early_offer.is_some() {
                    warn!("Ignoring duplicate offer for pending {}", pending.key);
                } else {
                    pending.early_offer = Some(offer);
                }
                return;
            }
            Some(SessionSlot::Live(session)) => session,
            None => {
                warn!("Ignoring offer from unknown peer {}", from);
                return;
            }
        };

        match session.signaling.remote_offer() {
            OfferDecision::Accept => {
                session.enqueue(NegotiationOp::AcceptOffer(offer));
                session.flush_candidates();
            }
            OfferDecision::Restart => {
                info!(
                    "Offer collision with {}, answering on a new connection",
                    session.key()
                );
                self.restart(from, offer);
            }
            OfferDecision::IgnoreDuplicate => {
                warn!("Ignoring offer from {}: remote description already set", from)
            }
            OfferDecision::IgnoreGlare => {
                info!("Offer collision with {}, keeping ours", session.key())
            }
            OfferDecision::IgnoreClosed => warn!("Ignoring offer for closed session {}", from),
        }
    }

    /// Replace the live session for `peer_id` with a fresh one that answers
    /// `offer`. Remote candidates buffered so far carry over.
    fn restart(&mut self, peer_id: &PeerId, offer: SessionDescription) {
        let candidates = match self.slots.remove(peer_id) {
            Some(SessionSlot::Live(mut session)) => {
                let candidates = session.take_candidates();
                session.close();
                candidates
            }
            Some(SessionSlot::Pending(pending)) => pending.candidates,
            None => CandidateBuffer::new(),
        };
        self.create(peer_id, false, Some(offer), candidates);
    }

    pub fn deliver_answer(&mut self, from: &PeerId, answer: SessionDescription) {
        let Some(SessionSlot::Live(session)) = self.slots.get_mut(from) else {
            warn!("Ignoring answer from {}: no live session", from);
            return;
        };

        if !session.signaling.remote_answer() {
            warn!(
                "Ignoring answer from {} in state {}",
                from,
                session.signaling.state()
            );
            return;
        }
        session.cancel_offer_timer();
        session.enqueue(NegotiationOp::ApplyAnswer(answer));
        session.flush_candidates();
    }

    /// Our offer is set locally; send it unless it was abandoned.
    pub async fn offer_created(&mut self, key: &SessionKey, offer: SessionDescription) {
        let timeout = self.offer_timeout;
        let events = self.negotiation_tx.clone();
        let Some(session) = self.live_mut(key) else {
            debug!("Dropping offer for replaced session {}", key);
            return;
        };
        if !session.signaling.local_offer_created() {
            debug!("Dropping abandoned offer for {}", key);
            return;
        }
        if let Some(timeout) = timeout {
            session.arm_offer_timer(timeout, events);
        }
        let held = session.local_description_sent();

        info!("Sending offer to {}", key.peer_id);
        self.relay.send_offer(key.peer_id.clone(), offer).await;
        self.send_candidates(&key.peer_id, held).await;
    }

    pub async fn answer_created(&mut self, key: &SessionKey, answer: SessionDescription) {
        let Some(session) = self.live_mut(key) else {
            debug!("Dropping answer for replaced session {}", key);
            return;
        };
        if !session.signaling.local_answer_sent() {
            warn!("Dropping answer for {} in state {}", key, session.state());
            return;
        }
        let held = session.local_description_sent();

        info!("Sending answer to {}", key.peer_id);
        self.relay.send_answer(key.peer_id.clone(), answer).await;
        self.send_candidates(&key.peer_id, held).await;
    }

    pub fn answer_applied(&mut self, key: &SessionKey) {
        if self.is_current(key) {
            info!("Negotiation with {} is stable", key);
        }
    }

    /// A local candidate was gathered for `key`.
    pub async fn local_candidate(&mut self, key: &SessionKey, candidate: IceCandidate) {
        let Some(session) = self.live_mut(key) else {
            debug!("Dropping local candidate for replaced session {}", key);
            return;
        };
        if let Some(candidate) = session.hold_or_release(candidate) {
            self.relay.send_ice(key.peer_id.clone(), candidate).await;
        }
    }

    async fn send_candidates(&self, to: &PeerId, candidates: Vec<IceCandidate>) {
        for candidate in candidates {
            self.relay.send_ice(to.clone(), candidate).await;
        }
    }

    /// Platform rejection for `key`: close that session only.
    pub fn fail(
        &mut self,
        key: &SessionKey,
        stage: NegotiationStage,
        error: anyhow::Error,
    ) -> Option<RoomError> {
        if !self.is_current(key) {
            debug!("Ignoring failure of replaced session {}: {:?}", key, error);
            return None;
        }
        error!("Negotiation with {} failed while {}: {:?}", key, stage, error);
        self.remove(&key.peer_id);
        Some(RoomError::Negotiation {
            peer_id: key.peer_id.clone(),
            stage,
            reason: format!("{error:#}"),
        })
    }

    pub fn offer_timed_out(&mut self, key: &SessionKey) -> Option<RoomError> {
        let session = self.live_mut(key)?;
        if session.state() != NegotiationState::HaveLocalOffer {
            return None;
        }
        warn!("No answer from {} in time, closing session", key);
        self.remove(&key.peer_id);
        Some(RoomError::NegotiationTimeout(key.peer_id.clone()))
    }

    pub fn ice_state_changed(
        &mut self,
        key: &SessionKey,
        state: IceConnectionState,
    ) -> Option<RoomError> {
        let session = self.live_mut(key)?;
        info!("ICE state for {}: {:?}", key, state);
        session.set_ice_state(state);
        if state != IceConnectionState::Failed {
            return None;
        }
        self.fail(
            key,
            NegotiationStage::IceConnection,
            anyhow::anyhow!("ICE connection failed"),
        )
    }

    /// Swap `track` in on every live session. Pending sessions pick up the
    /// current tracks when they are installed.
    pub fn replace_track_all(&self, track: &LocalTrack) {
        for slot in self.slots.values() {
            if let SessionSlot::Live(session) = slot {
                session.enqueue(NegotiationOp::ReplaceTrack(track.clone()));
            }
        }
    }

    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        let mut peers: Vec<PeerSnapshot> = self
            .slots
            .iter()
            .map(|(peer_id, slot)| match slot {
                SessionSlot::Pending(pending) => PeerSnapshot {
                    peer_id: peer_id.clone(),
                    generation: pending.key.generation,
                    status: SessionStatus::Pending,
                    buffered_candidates: pending.candidates.len(),
                },
                SessionSlot::Live(session) => PeerSnapshot {
                    peer_id: peer_id.clone(),
                    generation: session.key().generation,
                    status: SessionStatus::Live {
                        negotiation: session.state(),
                        ice: session.ice_state(),
                    },
                    buffered_candidates: session.candidates.len(),
                },
            })
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }
}

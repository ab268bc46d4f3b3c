use crate::config::RoomConfig;
use crate::error::{MediaError, RoomError};
use crate::media::{MediaDevices, MediaEvent, MediaTrackController};
use crate::room::{RenderSurface, RoomCommand, RoomMembership, RoomSnapshot};
use crate::session::{NegotiationEvent, NegotiationOutcome, PeerSessionRegistry};
use crate::signaling::{RelayEvent, RelayOutput};
use crate::transport::{PeerConnectionFactory, TransportEvent};
use peermesh_core::{PeerId, RelaySignal, RoomId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The external capabilities a room runs against.
pub struct RoomCollaborators {
    pub relay: Arc<dyn RelayOutput>,
    pub relay_events: mpsc::Receiver<RelayEvent>,
    pub render: Arc<dyn RenderSurface>,
    pub devices: Arc<dyn MediaDevices>,
    pub connections: Arc<dyn PeerConnectionFactory>,
}

/// The room actor.
///
/// Consumes user commands, relay events, and completions of platform work
/// in arrival order. Platform calls never run on this loop: they happen on
/// per-peer negotiator tasks and report back here, where the session they
/// belong to is re-validated before anything changes.
pub struct RoomCoordinator {
    config: RoomConfig,
    membership: Option<RoomMembership>,
    relay_connected: bool,
    relay_open: bool,

    registry: PeerSessionRegistry,
    media: MediaTrackController,

    relay: Arc<dyn RelayOutput>,
    render: Arc<dyn RenderSurface>,

    command_rx: mpsc::Receiver<RoomCommand>,
    relay_rx: mpsc::Receiver<RelayEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    negotiation_rx: mpsc::UnboundedReceiver<NegotiationEvent>,
    media_rx: mpsc::UnboundedReceiver<MediaEvent>,
}

impl RoomCoordinator {
    pub fn new(
        config: RoomConfig,
        collaborators: RoomCollaborators,
        command_rx: mpsc::Receiver<RoomCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(config.event_capacity.max(1));
        let (negotiation_tx, negotiation_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();

        let registry = PeerSessionRegistry::new(
            collaborators.connections,
            collaborators.relay.clone(),
            transport_tx,
            negotiation_tx,
            config.negotiation_timeout(),
        );
        let media = MediaTrackController::new(
            collaborators.devices,
            config.media.clone(),
            "local",
            media_tx,
        );

        Self {
            config,
            membership: None,
            relay_connected: false,
            relay_open: true,
            registry,
            media,
            relay: collaborators.relay,
            render: collaborators.render,
            command_rx,
            relay_rx: collaborators.relay_events,
            transport_rx,
            negotiation_rx,
            media_rx,
        }
    }

    /// Run the event loop until every [`crate::RoomHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Room event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down room.");
                            break;
                        }
                    }
                }

                evt = self.relay_rx.recv(), if self.relay_open => {
                    match evt {
                        Some(e) => self.handle_relay_event(e).await,
                        None => {
                            warn!("Relay event channel closed");
                            self.relay_open = false;
                            self.handle_relay_event(RelayEvent::Disconnected).await;
                        }
                    }
                }

                Some(evt) = self.negotiation_rx.recv() => {
                    self.handle_negotiation_event(evt).await;
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                Some(evt) = self.media_rx.recv() => {
                    self.handle_media_event(evt).await;
                }
            }
        }

        self.leave().await;
        info!("Room event loop finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                room_id,
                user_id,
                reply,
            } => {
                let result = self.join(room_id, user_id).await;
                let _ = reply.send(result);
            }

            RoomCommand::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }

            RoomCommand::StartMedia { constraints, reply } => {
                self.media.start(constraints, reply);
            }

            RoomCommand::ToggleAudio { reply } => {
                let _ = reply.send(self.media.toggle_audio().map_err(RoomError::from));
            }

            RoomCommand::ToggleVideo { reply } => {
                let state = self.media.state();
                if !state.has_stream() {
                    let _ = reply.send(Err(MediaError::NoLocalStream.into()));
                } else if state.video_enabled() {
                    let result = self.media.video_off(Some(&self.registry));
                    if result.is_ok() {
                        self.publish_local_stream().await;
                    }
                    let _ = reply.send(result.map(|()| false).map_err(RoomError::from));
                } else {
                    self.media.begin_video_on(reply);
                }
            }

            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn join(
        &mut self,
        room_id: RoomId,
        user_id: PeerId,
    ) -> Result<(), RoomError> {
        if let Some(membership) = &self.membership {
            return Err(RoomError::AlreadyInRoom(membership.room_id.clone()));
        }
        if !self.relay_connected {
            return Err(RoomError::RelayDisconnected);
        }

        info!("Joining room {} as {}", room_id, user_id);
        self.registry.bind(user_id.clone());
        self.membership = Some(RoomMembership::new(room_id.clone(), user_id.clone()));
        self.relay.join_room(room_id, user_id).await;
        Ok(())
    }

    /// Close every session, clear local media, forget the room. Idempotent.
    async fn leave(&mut self) {
        if let Some(membership) = self.membership.take() {
            info!("Leaving room {}", membership.room_id);
            if self.relay_connected {
                self.relay.leave_room().await;
            }
        }

        self.drop_all_sessions().await;

        if self.media.state().has_stream() {
            self.media.clear();
            self.render.on_local_stream(Vec::new()).await;
        } else {
            self.media.clear();
        }
    }

    async fn drop_all_sessions(&mut self) {
        for peer_id in self.registry.close_all() {
            self.render.on_peer_removed(peer_id).await;
        }
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected => {
                info!("Relay connected");
                self.relay_connected = true;
                if let Some(membership) = &self.membership {
                    info!("Rejoining room {}", membership.room_id);
                    self.relay
                        .join_room(membership.room_id.clone(), membership.user_id.clone())
                        .await;
                }
            }

            RelayEvent::Disconnected => {
                if self.relay_connected {
                    warn!("Relay disconnected, dropping all sessions");
                }
                self.relay_connected = false;
                self.drop_all_sessions().await;
            }

            RelayEvent::Signal(signal) => self.handle_signal(signal).await,
        }
    }

    async fn handle_signal(&mut self, signal: RelaySignal) {
        let Some(membership) = &self.membership else {
            debug!("Ignoring {:?}: not in a room", signal);
            return;
        };
        if signal.peer_id().is_some_and(|p| membership.is_self(p)) {
            debug!("Ignoring signal about ourselves");
            return;
        }

        match signal {
            RelaySignal::ExistingUsers(peers) => {
                info!("Room has {} existing member(s)", peers.len());
                for peer_id in peers {
                    if membership.is_self(&peer_id) {
                        continue;
                    }
                    self.registry.ensure_session(&peer_id, true);
                }
            }

            RelaySignal::UserJoined(peer_id) => {
                info!("{} joined the room", peer_id);
                self.registry
                    .ensure_session(&peer_id, self.config.initiate_on_member_joined);
            }

            RelaySignal::UserLeft(peer_id) => {
                info!("{} left the room", peer_id);
                if self.registry.remove(&peer_id) {
                    self.render.on_peer_removed(peer_id).await;
                }
            }

            RelaySignal::Offer { from, offer } => {
                debug!("Offer from {}", from);
                self.registry.ensure_session(&from, false);
                self.registry.deliver_offer(&from, offer);
            }

            RelaySignal::Answer { from, answer } => {
                debug!("Answer from {}", from);
                self.registry.deliver_answer(&from, answer);
            }

            RelaySignal::IceCandidate { from, candidate } => {
                self.registry.add_candidate(&from, candidate);
            }
        }
    }

    async fn handle_negotiation_event(&mut self, event: NegotiationEvent) {
        match event {
            NegotiationEvent::Created { key, result } => {
                let tracks = self.media.tracks();
                if let Err(e) = self.registry.install(key, result, &tracks) {
                    self.peer_failed(e).await;
                }
            }

            NegotiationEvent::Completed { key, outcome } => match outcome {
                NegotiationOutcome::OfferCreated(offer) => {
                    self.registry.offer_created(&key, offer).await
                }
                NegotiationOutcome::AnswerCreated(answer) => {
                    self.registry.answer_created(&key, answer).await
                }
                NegotiationOutcome::AnswerApplied => self.registry.answer_applied(&key),
            },

            NegotiationEvent::Failed { key, stage, error } => {
                if let Some(e) = self.registry.fail(&key, stage, error) {
                    self.peer_failed(e).await;
                }
            }

            NegotiationEvent::OfferTimeout { key } => {
                if let Some(e) = self.registry.offer_timed_out(&key) {
                    self.peer_failed(e).await;
                }
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(key, candidate) => {
                self.registry.local_candidate(&key, candidate).await;
            }

            TransportEvent::RemoteTrack(key, track) => {
                if !self.registry.is_current(&key) {
                    debug!("Ignoring remote track for replaced session {}", key);
                    return;
                }
                info!("Remote {} track from {}", track.kind, key.peer_id);
                self.render.on_remote_track(key.peer_id, track).await;
            }

            TransportEvent::IceStateChanged(key, state) => {
                if let Some(e) = self.registry.ice_state_changed(&key, state) {
                    self.peer_failed(e).await;
                }
            }
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Started {
                epoch,
                constraints,
                result,
                reply,
            } => {
                let result =
                    self.media
                        .finish_start(epoch, &constraints, result, Some(&self.registry));
                let result = self.media_outcome(result).await;
                let _ = reply.send(result);
            }

            MediaEvent::VideoReacquired {
                epoch,
                result,
                reply,
            } => {
                let result = self
                    .media
                    .finish_video_on(epoch, result, Some(&self.registry));
                let result = self.media_outcome(result).await;
                let _ = reply.send(result.map(|()| true));
            }
        }
    }

    /// Publish a successful media change, surface a failed one.
    async fn media_outcome(&self, result: Result<(), MediaError>) -> Result<(), RoomError> {
        match result {
            Ok(()) => {
                self.publish_local_stream().await;
                Ok(())
            }
            Err(MediaError::Cancelled) => Err(MediaError::Cancelled.into()),
            Err(e) => {
                let error = RoomError::from(e);
                self.render.on_error(&error).await;
                Err(error)
            }
        }
    }

    async fn publish_local_stream(&self) {
        self.render.on_local_stream(self.media.tracks()).await;
    }

    /// A single peer's session was closed because of `error`.
    async fn peer_failed(&mut self, error: RoomError) {
        if let Some(peer_id) = error.peer_id() {
            self.render.on_peer_removed(peer_id.clone()).await;
        }
        self.render.on_error(&error).await;
    }

    fn snapshot(&self) -> RoomSnapshot {
        let state = self.media.state();
        RoomSnapshot {
            room_id: self.membership.as_ref().map(|m| m.room_id.clone()),
            user_id: self.membership.as_ref().map(|m| m.user_id.clone()),
            relay_connected: self.relay_connected,
            has_local_stream: state.has_stream(),
            audio_enabled: state.audio_enabled(),
            video_enabled: state.video_enabled(),
            peers: self.registry.snapshot(),
        }
    }
}

use crate::config::{RelayClientConfig, RoomConfig};
use crate::error::RoomError;
use crate::media::{MediaConstraints, MediaDevices};
use crate::room::{RenderSurface, RoomCollaborators, RoomCommand, RoomCoordinator, RoomSnapshot};
use crate::signaling::WsRelay;
use crate::transport::WebRtcConnectionFactory;
use peermesh_core::{PeerId, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Cloneable handle to a running [`RoomCoordinator`]. Dropping every handle
/// leaves the room and stops the actor.
#[derive(Clone)]
pub struct RoomHandle {
    command_tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn spawn(config: RoomConfig, collaborators: RoomCollaborators) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(100);
        let room = RoomCoordinator::new(config, collaborators, command_rx);
        let task = tokio::spawn(room.run());
        (Self { command_tx }, task)
    }

    /// Run a room against a WebSocket relay with webrtc-rs connections.
    pub fn connect(
        config: RoomConfig,
        relay_config: RelayClientConfig,
        render: Arc<dyn RenderSurface>,
        devices: Arc<dyn MediaDevices>,
    ) -> (Self, JoinHandle<()>) {
        let (relay, relay_events, _relay_task) = WsRelay::spawn(relay_config, config.event_capacity);
        let connections = Arc::new(WebRtcConnectionFactory::new(config.transport.clone()));
        Self::spawn(
            config,
            RoomCollaborators {
                relay,
                relay_events,
                render,
                devices,
                connections,
            },
        )
    }

    pub async fn join(
        &self,
        room_id: impl Into<RoomId>,
        user_id: impl Into<PeerId>,
    ) -> Result<(), RoomError> {
        let room_id = room_id.into();
        let user_id = user_id.into();
        self.request(|reply| RoomCommand::Join {
            room_id,
            user_id,
            reply,
        })
        .await?
    }

    pub async fn leave(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { reply }).await
    }

    pub async fn start_media(&self, constraints: Option<MediaConstraints>) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartMedia { constraints, reply })
            .await?
    }

    /// Returns whether audio is now enabled.
    pub async fn toggle_audio(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ToggleAudio { reply })
            .await?
    }

    /// Returns whether video is now enabled.
    pub async fn toggle_video(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ToggleVideo { reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(command(reply))
            .await
            .map_err(|_| RoomError::Stopped)?;
        response.await.map_err(|_| RoomError::Stopped)
    }
}

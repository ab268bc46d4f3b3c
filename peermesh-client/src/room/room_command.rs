use crate::error::RoomError;
use crate::media::MediaConstraints;
use crate::room::RoomSnapshot;
use peermesh_core::{PeerId, RoomId};
use tokio::sync::oneshot;

/// User actions sent to the room actor. Each carries the channel its
/// outcome is reported on.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        room_id: RoomId,
        user_id: PeerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Leave {
        reply: oneshot::Sender<()>,
    },

    /// `None` uses the configured capture constraints.
    StartMedia {
        constraints: Option<MediaConstraints>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replies with the new enabled state.
    ToggleAudio {
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },

    ToggleVideo {
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },

    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

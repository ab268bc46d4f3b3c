use crate::media::TrackKind;
use peermesh_core::{PeerId, RoomId};
use std::fmt;
use thiserror::Error;

/// Which platform step a per-peer negotiation failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStage {
    CreateConnection,
    CreateOffer,
    AcceptOffer,
    ApplyAnswer,
    IceConnection,
}

impl fmt::Display for NegotiationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            NegotiationStage::CreateConnection => "creating the connection",
            NegotiationStage::CreateOffer => "creating the offer",
            NegotiationStage::AcceptOffer => "answering the remote offer",
            NegotiationStage::ApplyAnswer => "applying the remote answer",
            NegotiationStage::IceConnection => "establishing ICE connectivity",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("no local media stream")]
    NoLocalStream,

    #[error("a media acquisition is already in progress")]
    AcquisitionInProgress,

    #[error("permission denied for {0}")]
    PermissionDenied(TrackKind),

    #[error("{0} device unavailable: {1}")]
    DeviceUnavailable(TrackKind, String),

    #[error("platform returned no {0} track")]
    MissingTrack(TrackKind),

    #[error("media acquisition was cancelled by leaving the room")]
    Cancelled,
}

/// Errors surfaced to callers of [`crate::RoomHandle`] and to the render surface.
#[derive(Debug, Clone, Error)]
pub enum RoomError {
    #[error("relay channel is not connected")]
    RelayDisconnected,

    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),

    #[error("negotiation with {peer_id} failed while {stage}: {reason}")]
    Negotiation {
        peer_id: PeerId,
        stage: NegotiationStage,
        reason: String,
    },

    #[error("negotiation with {0} timed out")]
    NegotiationTimeout(PeerId),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("room coordinator has stopped")]
    Stopped,
}

impl RoomError {
    /// The peer a per-peer failure belongs to.
    pub fn peer_id(&self) -> Option<&PeerId> {
        match self {
            RoomError::Negotiation { peer_id, .. } | RoomError::NegotiationTimeout(peer_id) => {
                Some(peer_id)
            }
            _ => None,
        }
    }
}

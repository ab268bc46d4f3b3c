use crate::model::ice::IceCandidate;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::session_description::SessionDescription;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// Messages a participant sends to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientSignal {
    JoinRoom {
        room_id: RoomId,
        user_id: PeerId,
    },
    LeaveRoom,
    Offer {
        to: PeerId,
        offer: SessionDescription,
    },
    Answer {
        to: PeerId,
        answer: SessionDescription,
    },
    IceCandidate {
        to: PeerId,
        candidate: IceCandidate,
    },
}

/// Messages the relay delivers to a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RelaySignal {
    ExistingUsers(Vec<PeerId>),
    UserJoined(PeerId),
    UserLeft(PeerId),
    Offer {
        from: PeerId,
        offer: SessionDescription,
    },
    Answer {
        from: PeerId,
        answer: SessionDescription,
    },
    IceCandidate {
        from: PeerId,
        candidate: IceCandidate,
    },
}

impl RelaySignal {
    /// The remote participant this signal is about.
    pub fn peer_id(&self) -> Option<&PeerId> {
        match self {
            RelaySignal::ExistingUsers(_) => None,
            RelaySignal::UserJoined(peer_id) | RelaySignal::UserLeft(peer_id) => Some(peer_id),
            RelaySignal::Offer { from, .. }
            | RelaySignal::Answer { from, .. }
            | RelaySignal::IceCandidate { from, .. } => Some(from),
        }
    }
}

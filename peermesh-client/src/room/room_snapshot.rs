use crate::session::NegotiationState;
use crate::transport::IceConnectionState;
use peermesh_core::{PeerId, RoomId};

/// Read-only view of the room, taken between two actor steps.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: Option<RoomId>,
    pub user_id: Option<PeerId>,
    pub relay_connected: bool,
    pub has_local_stream: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub peers: Vec<PeerSnapshot>,
}

impl RoomSnapshot {
    pub fn in_room(&self) -> bool {
        self.room_id.is_some()
    }

    /// Local participant plus every known peer.
    pub fn participant_count(&self) -> usize {
        if self.in_room() { self.peers.len() + 1 } else { 0 }
    }

    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|p| &p.peer_id == peer_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerSnapshot {
    pub peer_id: PeerId,
    pub generation: u64,
    pub status: SessionStatus,
    pub buffered_candidates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The platform is still constructing the connection.
    Pending,
    Live {
        negotiation: NegotiationState,
        ice: IceConnectionState,
    },
}

impl SessionStatus {
    pub fn negotiation(&self) -> Option<NegotiationState> {
        match self {
            SessionStatus::Pending => None,
            SessionStatus::Live { negotiation, .. } => Some(*negotiation),
        }
    }
}

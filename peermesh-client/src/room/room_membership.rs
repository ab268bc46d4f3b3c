use peermesh_core::{PeerId, RoomId};

/// Exists exactly while the local participant is in a room. The set of
/// known peers is the session registry's key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room_id: RoomId,
    pub user_id: PeerId,
}

impl RoomMembership {
    pub fn new(room_id: RoomId, user_id: PeerId) -> Self {
        Self { room_id, user_id }
    }

    pub fn is_self(&self, peer_id: &PeerId) -> bool {
        &self.user_id == peer_id
    }
}

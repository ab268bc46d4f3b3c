use async_trait::async_trait;
use peermesh_core::{IceCandidate, PeerId, RoomId, SessionDescription};

/// Outbound half of the relay channel. Delivery is fire-and-forget: the
/// coordinator never waits on a remote peer, and anything lost while the
/// relay is down is re-derived by rejoining.
#[async_trait]
pub trait RelayOutput: Send + Sync {
    async fn join_room(&self, room_id: RoomId, user_id: PeerId);

    async fn leave_room(&self);

    async fn send_offer(&self, to: PeerId, offer: SessionDescription);

    async fn send_answer(&self, to: PeerId, answer: SessionDescription);

    async fn send_ice(&self, to: PeerId, candidate: IceCandidate);
}

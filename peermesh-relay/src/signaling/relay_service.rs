use axum::extract::ws::Message;
use dashmap::DashMap;
use peermesh_core::{PeerId, RelaySignal, RoomId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One WebSocket connection that announced itself as a participant.
struct PeerLink {
    connection_id: Uuid,
    room_id: RoomId,
    tx: mpsc::UnboundedSender<Message>,
}

struct RelayInner {
    peers: DashMap<PeerId, PeerLink>,
    rooms: DashMap<RoomId, BTreeSet<PeerId>>,
}

/// Room membership and message forwarding, shared by every connection.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                rooms: DashMap::new(),
            }),
        }
    }

    /// Members of `room_id`, sorted.
    pub fn members(&self, room_id: &RoomId) -> Vec<PeerId> {
        self.inner
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Add `user_id` to `room_id`. The joiner receives the current member
    /// list, everyone else hears about the joiner.
    pub fn join(
        &self,
        connection_id: Uuid,
        tx: mpsc::UnboundedSender<Message>,
        room_id: RoomId,
        user_id: PeerId,
    ) {
        if self.inner.peers.contains_key(&user_id) {
            warn!("{} joined again, replacing its previous membership", user_id);
            self.leave(&user_id);
        }

        let existing: Vec<PeerId> = {
            let mut members = self.inner.rooms.entry(room_id.clone()).or_default();
            let existing = members.iter().cloned().collect();
            members.insert(user_id.clone());
            existing
        };

        self.inner.peers.insert(
            user_id.clone(),
            PeerLink {
                connection_id,
                room_id: room_id.clone(),
                tx,
            },
        );
        info!(
            "{} joined room {} ({} already there)",
            user_id,
            room_id,
            existing.len()
        );

        self.send_signal(&user_id, &RelaySignal::ExistingUsers(existing.clone()));
        for member in &existing {
            self.send_signal(member, &RelaySignal::UserJoined(user_id.clone()));
        }
    }

    /// Remove `user_id` from its room and tell the remaining members.
    pub fn leave(&self, user_id: &PeerId) {
        let Some((_, link)) = self.inner.peers.remove(user_id) else {
            return;
        };

        let remaining: Vec<PeerId> = {
            let Some(mut members) = self.inner.rooms.get_mut(&link.room_id) else {
                return;
            };
            members.remove(user_id);
            members.iter().cloned().collect()
        };
        if remaining.is_empty() {
            self.inner
                .rooms
                .remove_if(&link.room_id, |_, members| members.is_empty());
        }

        info!("{} left room {}", user_id, link.room_id);
        for member in &remaining {
            self.send_signal(member, &RelaySignal::UserLeft(user_id.clone()));
        }
    }

    /// The connection that owned `user_id` went away. A newer connection
    /// that re-joined under the same id is left alone.
    pub fn disconnect(&self, connection_id: Uuid, user_id: &PeerId) {
        let owned = self
            .inner
            .peers
            .get(user_id)
            .is_some_and(|link| link.connection_id == connection_id);
        if owned {
            self.leave(user_id);
        }
    }

    /// Deliver a peer-addressed signal. The sender must be in a room.
    pub fn forward(&self, from: &PeerId, to: &PeerId, signal: RelaySignal) {
        if !self.inner.peers.contains_key(from) {
            warn!("Dropping signal from {} which has not joined a room", from);
            return;
        }
        self.send_signal(to, &signal);
    }

    fn send_signal(&self, peer_id: &PeerId, signal: &RelaySignal) {
        let Some(peer) = self.inner.peers.get(peer_id) else {
            warn!("Attempted to send signal to disconnected user {}", peer_id);
            return;
        };
        match serde_json::to_string(signal) {
            Ok(json) => {
                if let Err(e) = peer.tx.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize relay signal: {}", e),
        }
    }
}

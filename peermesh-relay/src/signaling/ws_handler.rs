use crate::signaling::RelayService;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use peermesh_core::{ClientSignal, PeerId, RelaySignal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Axum router serving the relay at `/ws`.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut user: Option<PeerId> = None;
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientSignal>(text.as_str()) {
                        Ok(signal) => handle_signal(&service, connection_id, &tx, &mut user, signal),
                        Err(e) => warn!("Invalid ClientSignal from {}: {:?}", connection_id, e),
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }
    send_task.abort();

    if let Some(user_id) = user {
        service.disconnect(connection_id, &user_id);
    }
    info!("WebSocket disconnected: {}", connection_id);
}

fn handle_signal(
    service: &RelayService,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<Message>,
    user: &mut Option<PeerId>,
    signal: ClientSignal,
) {
    match signal {
        ClientSignal::JoinRoom { room_id, user_id } => {
            if let Some(previous) = user.take() {
                service.disconnect(connection_id, &previous);
            }
            service.join(connection_id, tx.clone(), room_id, user_id.clone());
            *user = Some(user_id);
        }

        ClientSignal::LeaveRoom => {
            if let Some(user_id) = user.take() {
                service.disconnect(connection_id, &user_id);
            }
        }

        ClientSignal::Offer { to, offer } => {
            let Some(from) = user.clone() else {
                return not_joined(connection_id);
            };
            debug!("Forwarding offer {} -> {}", from, to);
            service.forward(&from, &to, RelaySignal::Offer { from: from.clone(), offer });
        }

        ClientSignal::Answer { to, answer } => {
            let Some(from) = user.clone() else {
                return not_joined(connection_id);
            };
            debug!("Forwarding answer {} -> {}", from, to);
            service.forward(&from, &to, RelaySignal::Answer { from: from.clone(), answer });
        }

        ClientSignal::IceCandidate { to, candidate } => {
            let Some(from) = user.clone() else {
                return not_joined(connection_id);
            };
            service.forward(
                &from,
                &to,
                RelaySignal::IceCandidate {
                    from: from.clone(),
                    candidate,
                },
            );
        }
    }
}

fn not_joined(connection_id: Uuid) {
    warn!("Connection {} sent a peer signal before joining", connection_id);
}

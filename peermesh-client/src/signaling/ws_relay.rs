use crate::config::RelayClientConfig;
use crate::signaling::{RelayEvent, RelayOutput};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use peermesh_core::{ClientSignal, IceCandidate, PeerId, RelaySignal, RoomId, SessionDescription};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client for the relay channel.
///
/// Keeps reconnecting (up to the configured number of consecutive failed
/// attempts) and reports `Connected`/`Disconnected` around every connection.
/// Messages sent while disconnected are dropped: the coordinator rejoins on
/// reconnect and rebuilds every session from scratch.
pub struct WsRelay {
    outbound: mpsc::UnboundedSender<ClientSignal>,
}

enum ConnectionEnd {
    /// The socket closed or failed; try again.
    Lost,
    /// Nobody is left to talk to; stop for good.
    Shutdown,
}

impl WsRelay {
    pub fn spawn(
        config: RelayClientConfig,
        event_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<RelayEvent>, JoinHandle<()>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(event_capacity.max(1));
        let task = tokio::spawn(run_relay_client(config, outbound_rx, events_tx));
        (Arc::new(Self { outbound }), events_rx, task)
    }

    fn send(&self, signal: ClientSignal) {
        if self.outbound.send(signal).is_err() {
            debug!("Relay client stopped; dropping outbound signal");
        }
    }
}

#[async_trait]
impl RelayOutput for WsRelay {
    async fn join_room(&self, room_id: RoomId, user_id: PeerId) {
        self.send(ClientSignal::JoinRoom { room_id, user_id });
    }

    async fn leave_room(&self) {
        self.send(ClientSignal::LeaveRoom);
    }

    async fn send_offer(&self, to: PeerId, offer: SessionDescription) {
        self.send(ClientSignal::Offer { to, offer });
    }

    async fn send_answer(&self, to: PeerId, answer: SessionDescription) {
        self.send(ClientSignal::Answer { to, answer });
    }

    async fn send_ice(&self, to: PeerId, candidate: IceCandidate) {
        self.send(ClientSignal::IceCandidate { to, candidate });
    }
}

async fn run_relay_client(
    config: RelayClientConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientSignal>,
    events_tx: mpsc::Sender<RelayEvent>,
) {
    let mut failed_attempts = 0u32;

    loop {
        match connect_async(config.url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to relay at {}", config.url);
                failed_attempts = 0;
                discard_stale(&mut outbound_rx);
                if events_tx.send(RelayEvent::Connected).await.is_err() {
                    break;
                }

                let end = run_connection(stream, &mut outbound_rx, &events_tx).await;
                if events_tx.send(RelayEvent::Disconnected).await.is_err() {
                    break;
                }
                if let ConnectionEnd::Shutdown = end {
                    break;
                }
                warn!("Relay connection lost");
            }
            Err(e) => {
                failed_attempts += 1;
                warn!(
                    "Failed to connect to relay ({}/{}): {}",
                    failed_attempts, config.reconnect_attempts, e
                );
            }
        }

        if failed_attempts >= config.reconnect_attempts {
            error!("Giving up on relay {}", config.url);
            break;
        }
        tokio::time::sleep(config.reconnect_delay()).await;
    }
    debug!("Relay client finished");
}

async fn run_connection(
    stream: RelayStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientSignal>,
    events_tx: &mpsc::Sender<RelayEvent>,
) -> ConnectionEnd {
    let (mut sender, mut receiver) = stream.split();

    loop {
        tokio::select! {
            signal = outbound_rx.recv() => {
                let Some(signal) = signal else {
                    let _ = sender.send(Message::Close(None)).await;
                    return ConnectionEnd::Shutdown;
                };
                match serde_json::to_string(&signal) {
                    Ok(json) => {
                        if let Err(e) = sender.send(Message::Text(json.into())).await {
                            warn!("Failed to send to relay: {}", e);
                            return ConnectionEnd::Lost;
                        }
                    }
                    Err(e) => error!("Failed to serialize relay signal: {}", e),
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<RelaySignal>(text.as_str()) {
                            Ok(signal) => {
                                if events_tx.send(RelayEvent::Signal(signal)).await.is_err() {
                                    return ConnectionEnd::Shutdown;
                                }
                            }
                            Err(e) => warn!("Invalid relay message: {:?}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Lost,
                    Some(Err(e)) => {
                        warn!("Relay socket error: {}", e);
                        return ConnectionEnd::Lost;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Drop whatever was queued while no connection was up.
fn discard_stale(outbound_rx: &mut mpsc::UnboundedReceiver<ClientSignal>) {
    let mut dropped = 0usize;
    while outbound_rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!("Discarded {} signal(s) queued while disconnected", dropped);
    }
}

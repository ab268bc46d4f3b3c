use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use peermesh_core::{ClientSignal, RelaySignal};
use peermesh_relay::{RelayService, router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for a single relay message (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Start a relay on an ephemeral port.
pub async fn start_relay() -> Result<(SocketAddr, RelayService)> {
    let service = RelayService::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(service.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, service))
}

/// Raw WebSocket participant speaking the relay protocol.
pub struct WsTestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .context("Failed to connect to relay")?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, signal: ClientSignal) -> Result<()> {
        let json = serde_json::to_string(&signal)?;
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<RelaySignal> {
        let timeout = Duration::from_millis(SIGNAL_TIMEOUT_MS);
        loop {
            let msg = tokio::time::timeout(timeout, self.stream.next())
                .await
                .context("Timeout waiting for relay message")?;
            match msg {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("Relay socket error: {e}"),
                None => bail!("Relay closed the connection"),
            }
        }
    }

    /// True when nothing arrives within `ms`.
    pub async fn is_quiet_for(&mut self, ms: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(ms), self.stream.next())
            .await
            .is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

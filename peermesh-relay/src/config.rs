use clap::Parser;
use std::net::SocketAddr;

#[derive(Debug, Clone, Parser)]
#[command(name = "peermesh-relay", about = "WebSocket relay for peermesh rooms")]
pub struct RelayConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// tracing-subscriber filter, overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log: String,
}

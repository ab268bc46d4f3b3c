use peermesh_core::RelaySignal;

/// Inbound half of the relay channel, as seen by the room coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Connected,
    Disconnected,
    Signal(RelaySignal),
}

impl From<RelaySignal> for RelayEvent {
    fn from(signal: RelaySignal) -> Self {
        RelayEvent::Signal(signal)
    }
}

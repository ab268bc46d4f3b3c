use peermesh_client::{NegotiationState, RoomConfig};
use peermesh_core::{PeerId, RelaySignal, SessionDescription};

use crate::integration::{TestRoom, init_tracing, peers};
use crate::utils::{MockDevices, MockTransport, RelayCall, WAIT_TIMEOUT_MS, wait_until};

#[tokio::test]
async fn test_local_candidates_are_sent_after_offer() {
    init_tracing();

    let room = TestRoom::with(
        RoomConfig::default(),
        MockTransport::with_candidates(2),
        MockDevices::new(),
    );
    room.join("r1", "a").await;

    room.signal(RelaySignal::ExistingUsers(peers(&["b"]))).await;
    assert!(wait_until(WAIT_TIMEOUT_MS, || room.relay.sent_to("b").len() == 3).await);

    let sent = room.relay.sent_to("b");
    assert!(matches!(sent[0], RelayCall::Offer { .. }));
    assert!(matches!(sent[1], RelayCall::Ice { .. }));
    assert!(matches!(sent[2], RelayCall::Ice { .. }));
}

#[tokio::test]
async fn test_local_candidates_are_sent_after_answer() {
    init_tracing();

    let room = TestRoom::with(
        RoomConfig::default(),
        MockTransport::with_candidates(2),
        MockDevices::new(),
    );
    room.join("r1", "a").await;

    room.signal(RelaySignal::Offer {
        from: PeerId::from("b"),
        offer: SessionDescription::offer("v=0 offer b"),
    })
    .await;
    room.wait_for_state("b", NegotiationState::Stable).await;
    assert!(wait_until(WAIT_TIMEOUT_MS, || room.relay.sent_to("b").len() == 3).await);

    let sent = room.relay.sent_to("b");
    assert!(matches!(sent[0], RelayCall::Answer { .. }));
    assert!(sent[1..].iter().all(|c| matches!(c, RelayCall::Ice { .. })));
}

use peermesh_client::{
    NegotiationState, RelayClientConfig, RoomCollaborators, RoomConfig, RoomHandle, WsRelay,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::integration::{init_tracing, negotiation_of};
use crate::utils::{
    ConnectionCall, MockDevices, MockRender, MockTransport, WAIT_TIMEOUT_MS, relay_url,
    start_relay, wait_for_snapshot, wait_until,
};

struct Participant {
    handle: RoomHandle,
    render: Arc<MockRender>,
    transport: Arc<MockTransport>,
}

async fn participant(config: RoomConfig, addr: SocketAddr) -> Participant {
    let relay_config = RelayClientConfig::new(relay_url(addr));
    let (relay, relay_events, _relay_task) = WsRelay::spawn(relay_config, config.event_capacity);
    let render = Arc::new(MockRender::new());
    let transport = Arc::new(MockTransport::with_candidates(1));

    let (handle, _task) = RoomHandle::spawn(
        config,
        RoomCollaborators {
            relay,
            relay_events,
            render: render.clone(),
            devices: Arc::new(MockDevices::new()),
            connections: transport.clone(),
        },
    );
    wait_for_snapshot(&handle, |s| s.relay_connected).await;

    Participant {
        handle,
        render,
        transport,
    }
}

async fn both_reach_stable(config: RoomConfig) -> (Participant, Participant) {
    let addr = start_relay().await;
    let alice = participant(config.clone(), addr).await;
    let bob = participant(config, addr).await;

    alice.handle.start_media(None).await.unwrap();
    bob.handle.start_media(None).await.unwrap();

    alice.handle.join("demo", "alice").await.unwrap();
    wait_for_snapshot(&alice.handle, |s| s.in_room()).await;
    bob.handle.join("demo", "bob").await.unwrap();

    wait_for_snapshot(&alice.handle, |s| {
        negotiation_of(s, "bob") == Some(NegotiationState::Stable)
    })
    .await;
    wait_for_snapshot(&bob.handle, |s| {
        negotiation_of(s, "alice") == Some(NegotiationState::Stable)
    })
    .await;

    (alice, bob)
}

#[tokio::test]
async fn test_newcomer_offer_reaches_stable_on_both_sides() {
    init_tracing();

    let config = RoomConfig {
        initiate_on_member_joined: false,
        ..RoomConfig::default()
    };
    let (alice, bob) = both_reach_stable(config).await;

    let alice_side = alice.transport.connection("bob").unwrap();
    assert_eq!(alice_side.count(&ConnectionCall::CreateOffer), 0);
    assert_eq!(alice_side.count(&ConnectionCall::CreateAnswer), 1);
    let bob_side = bob.transport.connection("alice").unwrap();
    assert_eq!(bob_side.count(&ConnectionCall::CreateOffer), 1);

    // Trickled candidates made it across in both directions.
    assert!(
        wait_until(WAIT_TIMEOUT_MS, || {
            alice_side.position(|c| matches!(c, ConnectionCall::AddCandidate(_))).is_some()
                && bob_side.position(|c| matches!(c, ConnectionCall::AddCandidate(_))).is_some()
        })
        .await
    );
    assert!(wait_until(WAIT_TIMEOUT_MS, || alice.render.remote_tracks_from("bob") > 0).await);
}

#[tokio::test]
async fn test_simultaneous_offers_settle_on_one_negotiation() {
    init_tracing();

    let (alice, bob) = both_reach_stable(RoomConfig::default()).await;

    // Alice sorts first: she drops the connection holding her offer and
    // answers bob on a new one.
    assert_eq!(alice.transport.created_for("bob"), 2);
    let dropped = alice.transport.connections()[0].clone();
    assert!(wait_until(WAIT_TIMEOUT_MS, || dropped.is_closed()).await);
    let answering = alice.transport.connection("bob").unwrap();
    assert_eq!(answering.count(&ConnectionCall::CreateOffer), 0);
    assert_eq!(answering.count(&ConnectionCall::CreateAnswer), 1);

    assert_eq!(bob.transport.created_for("alice"), 1);
    let offering = bob.transport.connection("alice").unwrap();
    assert_eq!(offering.count(&ConnectionCall::CreateAnswer), 0);
    assert!(alice.render.errors().is_empty());
    assert!(bob.render.errors().is_empty());
}

#[tokio::test]
async fn test_leaving_member_is_removed_from_the_other_room() {
    init_tracing();

    let config = RoomConfig {
        initiate_on_member_joined: false,
        ..RoomConfig::default()
    };
    let (alice, bob) = both_reach_stable(config).await;

    bob.handle.leave().await.unwrap();

    wait_for_snapshot(&alice.handle, |s| s.peers.is_empty()).await;
    assert!(wait_until(WAIT_TIMEOUT_MS, || alice.render.was_removed("bob")).await);
    let closed = alice.transport.connection("bob").unwrap();
    assert!(wait_until(WAIT_TIMEOUT_MS, || closed.is_closed()).await);
}

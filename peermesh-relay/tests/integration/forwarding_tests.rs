use peermesh_core::{ClientSignal, IceCandidate, PeerId, RelaySignal, RoomId, SessionDescription};

use crate::utils::{WsTestClient, start_relay};

async fn joined_pair(addr: std::net::SocketAddr) -> (WsTestClient, WsTestClient) {
    let mut a = WsTestClient::connect(addr).await.unwrap();
    let mut b = WsTestClient::connect(addr).await.unwrap();
    for (client, user) in [(&mut a, "a"), (&mut b, "b")] {
        client
            .send(ClientSignal::JoinRoom {
                room_id: RoomId::from("r1"),
                user_id: PeerId::from(user),
            })
            .await
            .unwrap();
        client.recv().await.unwrap();
    }
    // a hears that b joined
    a.recv().await.unwrap();
    (a, b)
}

#[tokio::test]
async fn test_offer_answer_and_candidates_carry_sender() {
    let (addr, _service) = start_relay().await.unwrap();
    let (mut a, mut b) = joined_pair(addr).await;

    let offer = SessionDescription::offer("v=0 offer");
    a.send(ClientSignal::Offer {
        to: PeerId::from("b"),
        offer: offer.clone(),
    })
    .await
    .unwrap();
    assert_eq!(
        b.recv().await.unwrap(),
        RelaySignal::Offer {
            from: PeerId::from("a"),
            offer
        }
    );

    let answer = SessionDescription::answer("v=0 answer");
    b.send(ClientSignal::Answer {
        to: PeerId::from("a"),
        answer: answer.clone(),
    })
    .await
    .unwrap();
    assert_eq!(
        a.recv().await.unwrap(),
        RelaySignal::Answer {
            from: PeerId::from("b"),
            answer
        }
    );

    let candidate = IceCandidate::new("candidate:1 1 udp 1 127.0.0.1 5000 typ host");
    b.send(ClientSignal::IceCandidate {
        to: PeerId::from("a"),
        candidate: candidate.clone(),
    })
    .await
    .unwrap();
    assert_eq!(
        a.recv().await.unwrap(),
        RelaySignal::IceCandidate {
            from: PeerId::from("b"),
            candidate
        }
    );
}

#[tokio::test]
async fn test_signals_before_join_are_dropped() {
    let (addr, _service) = start_relay().await.unwrap();
    let (mut a, _b) = joined_pair(addr).await;
    let mut stranger = WsTestClient::connect(addr).await.unwrap();

    stranger
        .send(ClientSignal::Offer {
            to: PeerId::from("a"),
            offer: SessionDescription::offer("v=0"),
        })
        .await
        .unwrap();

    assert!(a.is_quiet_for(200).await);
}

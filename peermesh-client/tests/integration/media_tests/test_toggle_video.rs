use peermesh_client::{
    MediaConstraints, MediaError, NegotiationState, RoomConfig, RoomError, TrackKind, TrackSource,
};
use peermesh_core::{PeerId, RelaySignal, SessionDescription};

use crate::integration::{TestRoom, init_tracing, peers};
use crate::utils::{WAIT_TIMEOUT_MS, settle, wait_until};

async fn room_with_two_stable_peers() -> TestRoom {
    let room = TestRoom::spawn(RoomConfig::default());
    room.handle.start_media(None).await.expect("media failed");
    room.join("r1", "a").await;

    room.signal(RelaySignal::ExistingUsers(peers(&["b", "c"])))
        .await;
    for peer in ["b", "c"] {
        room.wait_for_state(peer, NegotiationState::HaveLocalOffer)
            .await;
    }
    assert!(wait_until(WAIT_TIMEOUT_MS, || room.relay.total_offers() == 2).await);
    for peer in ["b", "c"] {
        room.signal(RelaySignal::Answer {
            from: PeerId::from(peer),
            answer: SessionDescription::answer(format!("v=0 answer {peer}")),
        })
        .await;
        room.wait_for_state(peer, NegotiationState::Stable).await;
    }
    room
}

#[tokio::test]
async fn test_video_off_and_on_swaps_tracks_without_renegotiating() {
    init_tracing();

    let room = room_with_two_stable_peers().await;

    assert!(!room.handle.toggle_video().await.unwrap());
    for peer in ["b", "c"] {
        let connection = room.transport.connection(peer).unwrap();
        assert!(
            wait_until(WAIT_TIMEOUT_MS, || {
                connection
                    .last_replaced(TrackKind::Video)
                    .is_some_and(|(source, _)| source == TrackSource::Substitute)
            })
            .await,
            "substitute never reached {peer}"
        );
    }
    let snapshot = room.snapshot().await;
    assert!(!snapshot.video_enabled);
    assert!(snapshot.has_local_stream);

    assert!(room.handle.toggle_video().await.unwrap());
    for peer in ["b", "c"] {
        let connection = room.transport.connection(peer).unwrap();
        assert!(
            wait_until(WAIT_TIMEOUT_MS, || {
                connection.last_replaced(TrackKind::Video)
                    == Some((TrackSource::Camera, "cam-1".to_owned()))
            })
            .await,
            "new camera never reached {peer}"
        );
    }

    settle().await;
    assert_eq!(room.relay.total_offers(), 2);
    assert_eq!(room.transport.connections().len(), 2);
    assert!(room.snapshot().await.video_enabled);

    let stream = room.render.local_stream().unwrap();
    assert!(stream.contains(&(TrackKind::Video, TrackSource::Camera, "cam-1".to_owned())));
    assert!(stream.iter().any(|(kind, _, _)| *kind == TrackKind::Audio));

    let requests = room.devices.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[1].audio);
    assert!(requests[1].wants_video());
}

#[tokio::test]
async fn test_failed_camera_reacquire_keeps_substitute() {
    init_tracing();

    let room = room_with_two_stable_peers().await;
    assert!(!room.handle.toggle_video().await.unwrap());

    room.devices.fail_next(MediaError::DeviceUnavailable(
        TrackKind::Video,
        "unplugged".to_owned(),
    ));
    let result = room.handle.toggle_video().await;
    assert!(matches!(
        result,
        Err(RoomError::Media(MediaError::DeviceUnavailable(TrackKind::Video, _)))
    ));

    settle().await;
    assert!(!room.snapshot().await.video_enabled);
    for peer in ["b", "c"] {
        let (source, _) = room
            .transport
            .connection(peer)
            .unwrap()
            .last_replaced(TrackKind::Video)
            .unwrap();
        assert_eq!(source, TrackSource::Substitute);
    }
    assert_eq!(room.render.errors().len(), 1);
    assert_eq!(room.relay.total_offers(), 2);
}

#[tokio::test]
async fn test_toggle_video_without_stream_fails() {
    init_tracing();

    let room = TestRoom::spawn(RoomConfig::default());
    let result = room.handle.toggle_video().await;
    assert!(matches!(
        result,
        Err(RoomError::Media(MediaError::NoLocalStream))
    ));
}

#[tokio::test]
async fn test_audio_only_start_can_turn_camera_on() {
    init_tracing();

    let room = TestRoom::spawn(RoomConfig::default());
    room.handle
        .start_media(Some(MediaConstraints::audio_only()))
        .await
        .unwrap();

    let stream = room.render.local_stream().unwrap();
    assert!(stream.iter().any(|(kind, source, _)| {
        *kind == TrackKind::Video && *source == TrackSource::Substitute
    }));
    assert!(!room.snapshot().await.video_enabled);

    assert!(room.handle.toggle_video().await.unwrap());
    let snapshot = room.snapshot().await;
    assert!(snapshot.video_enabled);
    assert!(snapshot.audio_enabled);
}

use peermesh_client::{RoomHandle, RoomSnapshot};
use std::time::Duration;

/// Default wait for asynchronous room effects (ms).
pub const WAIT_TIMEOUT_MS: u64 = 5000;

/// Poll `condition` until it holds or the timeout elapses.
pub async fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll room snapshots until one satisfies `condition`, and return it.
pub async fn wait_for_snapshot(
    handle: &RoomHandle,
    mut condition: impl FnMut(&RoomSnapshot) -> bool,
) -> RoomSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(WAIT_TIMEOUT_MS);
    loop {
        let snapshot = handle.snapshot().await.expect("room stopped");
        if condition(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for room state, last snapshot: {snapshot:#?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Give the room a moment to process anything still in flight.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

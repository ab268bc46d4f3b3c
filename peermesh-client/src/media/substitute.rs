use crate::media::{LocalTrack, TrackKind, TrackSource, codec_for};
use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use webrtc::media::Sample;

/// A VP8 keyframe of a solid black 640x480 picture.
static BLACK_FRAME_VP8: &[u8] = include_bytes!("black_640x480.vp8");

/// Placeholder video sent in place of the camera while video is off.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubstituteVideoConfig {
    pub width: u32,
    pub height: u32,
    pub frame_interval_ms: u64,
    /// One pre-encoded VP8 frame repeated for as long as the track lives.
    /// Defaults to a black keyframe matching `width` and `height`.
    #[serde(skip)]
    pub frame: Bytes,
}

impl SubstituteVideoConfig {
    pub fn with_frame(frame: impl Into<Bytes>) -> Self {
        Self {
            frame: frame.into(),
            ..Self::default()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

impl Default for SubstituteVideoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_interval_ms: 1_000,
            frame: Bytes::from_static(BLACK_FRAME_VP8),
        }
    }
}

/// Build a substitute video track and start pumping its frame.
/// The pump ends when the track is stopped.
pub fn substitute_video_track(config: &SubstituteVideoConfig, stream_id: &str) -> LocalTrack {
    let track = LocalTrack::new(
        TrackKind::Video,
        TrackSource::Substitute,
        codec_for(TrackKind::Video),
        format!("substitute-{}x{}", config.width, config.height),
        stream_id,
    );

    if config.frame.is_empty() {
        warn!("Substitute video has no frame to send");
    } else {
        tokio::spawn(pump_frames(
            track.clone(),
            config.frame.clone(),
            config.frame_interval(),
        ));
    }
    track
}

async fn pump_frames(track: LocalTrack, frame: Bytes, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    let sample = Sample {
        data: frame,
        duration: interval,
        ..Default::default()
    };

    loop {
        tokio::select! {
            _ = track.stopped() => break,
            _ = ticker.tick() => {
                if let Err(e) = track.write_sample(&sample).await {
                    warn!("Substitute frame dropped: {}", e);
                }
            }
        }
    }
    debug!("Substitute pump for {} stopped", track.id());
}

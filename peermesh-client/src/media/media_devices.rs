use crate::error::MediaError;
use crate::media::LocalTrack;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

/// What to ask the platform for when acquiring local media.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    /// `None` means no camera.
    pub video: Option<VideoConstraints>,
}

impl MediaConstraints {
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: None,
        }
    }

    pub fn video_only(video: VideoConstraints) -> Self {
        Self {
            audio: false,
            video: Some(video),
        }
    }

    pub fn wants_video(&self) -> bool {
        self.video.is_some()
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: Some(VideoConstraints::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Platform capture capability.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire the requested tracks. Either every requested track is
    /// returned or an error is, never a partial set.
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<LocalTrack>, MediaError>;
}

/// Devices fed by the application: every acquired track is handed to the
/// application through a channel, which then writes encoded samples into it.
pub struct ExternalMediaDevices {
    stream_id: String,
    tracks_tx: mpsc::UnboundedSender<LocalTrack>,
}

impl ExternalMediaDevices {
    pub fn new(stream_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<LocalTrack>) {
        let (tracks_tx, tracks_rx) = mpsc::unbounded_channel();
        let devices = Self {
            stream_id: stream_id.into(),
            tracks_tx,
        };
        (devices, tracks_rx)
    }
}

#[async_trait]
impl MediaDevices for ExternalMediaDevices {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<LocalTrack>, MediaError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(LocalTrack::microphone("microphone", self.stream_id.as_str()));
        }
        if let Some(video) = constraints.video {
            debug!(
                "Opening camera at {}x{}",
                video.ideal_width, video.ideal_height
            );
            tracks.push(LocalTrack::camera("camera", self.stream_id.as_str()));
        }

        for track in &tracks {
            if self.tracks_tx.send(track.clone()).is_err() {
                return Err(MediaError::DeviceUnavailable(
                    track.kind(),
                    "sample feed closed".to_owned(),
                ));
            }
        }
        Ok(tracks)
    }
}

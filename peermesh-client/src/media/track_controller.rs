use crate::config::MediaConfig;
use crate::error::{MediaError, RoomError};
use crate::media::{
    LocalMediaState, LocalTrack, MediaConstraints, MediaDevices, TrackKind,
    substitute_video_track,
};
use crate::session::PeerSessionRegistry;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Completion of a device acquisition, re-entering the room actor.
pub enum MediaEvent {
    Started {
        epoch: u64,
        constraints: MediaConstraints,
        result: Result<Vec<LocalTrack>, MediaError>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    VideoReacquired {
        epoch: u64,
        result: Result<Vec<LocalTrack>, MediaError>,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },
}

/// Owns the local tracks and pushes track changes to every session.
pub struct MediaTrackController {
    state: LocalMediaState,
    devices: Arc<dyn MediaDevices>,
    config: MediaConfig,
    stream_id: String,
    media_tx: mpsc::UnboundedSender<MediaEvent>,
    acquiring: bool,
    /// Bumped by [`MediaTrackController::clear`] so acquisitions that finish
    /// after the stream was torn down are thrown away.
    epoch: u64,
}

impl MediaTrackController {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        config: MediaConfig,
        stream_id: impl Into<String>,
        media_tx: mpsc::UnboundedSender<MediaEvent>,
    ) -> Self {
        Self {
            state: LocalMediaState::default(),
            devices,
            config,
            stream_id: stream_id.into(),
            media_tx,
            acquiring: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &LocalMediaState {
        &self.state
    }

    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.state.tracks()
    }

    /// Request local capture. Completes through [`MediaEvent::Started`].
    pub fn start(
        &mut self,
        constraints: Option<MediaConstraints>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    ) {
        if self.acquiring {
            let _ = reply.send(Err(MediaError::AcquisitionInProgress.into()));
            return;
        }
        self.acquiring = true;

        let constraints = constraints.unwrap_or_else(|| self.config.capture.clone());
        let devices = self.devices.clone();
        let media_tx = self.media_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = devices.acquire(constraints.clone()).await;
            let _ = media_tx.send(MediaEvent::Started {
                epoch,
                constraints,
                result,
                reply,
            });
        });
    }

    /// Install acquired tracks as the local stream and push them to every
    /// live session.
    pub fn finish_start(
        &mut self,
        epoch: u64,
        constraints: &MediaConstraints,
        result: Result<Vec<LocalTrack>, MediaError>,
        sessions: Option<&PeerSessionRegistry>,
    ) -> Result<(), MediaError> {
        let mut tracks = self.accept_acquisition(epoch, result)?;

        if constraints.audio && !tracks.iter().any(|t| t.kind() == TrackKind::Audio) {
            stop_all(&tracks);
            return Err(MediaError::MissingTrack(TrackKind::Audio));
        }
        let has_camera = tracks.iter().any(|t| t.kind() == TrackKind::Video);
        if constraints.wants_video() && !has_camera {
            stop_all(&tracks);
            return Err(MediaError::MissingTrack(TrackKind::Video));
        }
        if !has_camera {
            tracks.push(substitute_video_track(
                &self.config.substitute,
                &self.stream_id,
            ));
        }

        stop_all(&self.state.take());
        let audio_enabled = tracks.iter().any(|t| t.kind() == TrackKind::Audio);
        self.state.install(tracks, audio_enabled, has_camera);
        info!(
            "Local media started (audio: {}, video: {})",
            audio_enabled, has_camera
        );

        if let Some(sessions) = sessions {
            for track in self.state.tracks() {
                sessions.replace_track_all(&track);
            }
        }
        Ok(())
    }

    /// Flip `enabled` on every local audio track. Connections are untouched.
    /// A stream without audio stays muted.
    pub fn toggle_audio(&mut self) -> Result<bool, MediaError> {
        if !self.state.has_stream() {
            return Err(MediaError::NoLocalStream);
        }
        if self.state.audio_tracks().next().is_none() {
            self.state.set_audio_enabled(false);
            info!("No local audio track to unmute");
            return Ok(false);
        }
        let enabled = !self.state.audio_enabled();
        for track in self.state.audio_tracks() {
            track.set_enabled(enabled);
        }
        self.state.set_audio_enabled(enabled);
        info!("Audio {}", if enabled { "unmuted" } else { "muted" });
        Ok(enabled)
    }

    /// Turn the camera off: stop it, send the substitute everywhere instead.
    pub fn video_off(&mut self, sessions: Option<&PeerSessionRegistry>) -> Result<(), MediaError> {
        if !self.state.has_stream() {
            return Err(MediaError::NoLocalStream);
        }
        if let Some(camera) = self.state.video_track() {
            camera.stop();
        }

        let substitute = substitute_video_track(&self.config.substitute, &self.stream_id);
        if let Some(sessions) = sessions {
            sessions.replace_track_all(&substitute);
        }
        if let Some(previous) = self.state.swap_video(substitute) {
            previous.stop();
        }
        info!("Video off");
        Ok(())
    }

    /// Start re-acquiring the camera. Completes through
    /// [`MediaEvent::VideoReacquired`].
    pub fn begin_video_on(&mut self, reply: oneshot::Sender<Result<bool, RoomError>>) {
        if !self.state.has_stream() {
            let _ = reply.send(Err(MediaError::NoLocalStream.into()));
            return;
        }
        if self.acquiring {
            let _ = reply.send(Err(MediaError::AcquisitionInProgress.into()));
            return;
        }
        self.acquiring = true;

        let video = self.config.capture.video.unwrap_or_default();
        let devices = self.devices.clone();
        let media_tx = self.media_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = devices
                .acquire(MediaConstraints::video_only(video))
                .await;
            let _ = media_tx.send(MediaEvent::VideoReacquired {
                epoch,
                result,
                reply,
            });
        });
    }

    /// Put the re-acquired camera back on every session. On failure the
    /// substitute stays in place and video stays off.
    pub fn finish_video_on(
        &mut self,
        epoch: u64,
        result: Result<Vec<LocalTrack>, MediaError>,
        sessions: Option<&PeerSessionRegistry>,
    ) -> Result<(), MediaError> {
        let tracks = self.accept_acquisition(epoch, result)?;

        let mut camera = None;
        for track in tracks {
            if camera.is_none() && track.kind() == TrackKind::Video {
                camera = Some(track);
            } else {
                track.stop();
            }
        }
        let Some(camera) = camera else {
            return Err(MediaError::MissingTrack(TrackKind::Video));
        };

        if let Some(substitute) = self.state.video_track() {
            substitute.stop();
        }
        if let Some(sessions) = sessions {
            sessions.replace_track_all(&camera);
        }
        self.state.swap_video(camera);
        info!("Video on");
        Ok(())
    }

    /// Stop and drop every local track. Pending acquisitions are cancelled.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.acquiring = false;
        stop_all(&self.state.take());
    }

    fn accept_acquisition(
        &mut self,
        epoch: u64,
        result: Result<Vec<LocalTrack>, MediaError>,
    ) -> Result<Vec<LocalTrack>, MediaError> {
        if epoch != self.epoch {
            if let Ok(tracks) = &result {
                stop_all(tracks);
            }
            return Err(MediaError::Cancelled);
        }
        self.acquiring = false;
        result.inspect_err(|e| warn!("Media acquisition failed: {}", e))
    }
}

fn stop_all(tracks: &[LocalTrack]) {
    for track in tracks {
        track.stop();
    }
}

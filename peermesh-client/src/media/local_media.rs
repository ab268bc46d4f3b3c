use crate::media::{LocalTrack, TrackKind, TrackSource};

/// The local capture stream and the user's audio/video switches.
#[derive(Debug, Default)]
pub struct LocalMediaState {
    capture_stream: Option<Vec<LocalTrack>>,
    audio_enabled: bool,
    video_enabled: bool,
}

impl LocalMediaState {
    pub fn has_stream(&self) -> bool {
        self.capture_stream.is_some()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// Every track in the local stream, audio first.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        let mut tracks: Vec<LocalTrack> = self.capture_stream.iter().flatten().cloned().collect();
        tracks.sort_by_key(|track| track.kind() == TrackKind::Video);
        tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &LocalTrack> {
        self.capture_stream
            .iter()
            .flatten()
            .filter(|track| track.kind() == TrackKind::Audio)
    }

    pub fn video_track(&self) -> Option<&LocalTrack> {
        self.capture_stream
            .iter()
            .flatten()
            .find(|track| track.kind() == TrackKind::Video)
    }

    pub(crate) fn install(&mut self, tracks: Vec<LocalTrack>, audio_enabled: bool, video_enabled: bool) {
        self.capture_stream = Some(tracks);
        self.audio_enabled = audio_enabled;
        self.video_enabled = video_enabled;
    }

    pub(crate) fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    /// Swap the video track in the local stream. Returns the removed track.
    pub(crate) fn swap_video(&mut self, track: LocalTrack) -> Option<LocalTrack> {
        let stream = self.capture_stream.get_or_insert_with(Vec::new);
        let previous = stream
            .iter()
            .position(|t| t.kind() == TrackKind::Video)
            .map(|index| stream.remove(index));

        self.video_enabled = track.source() != TrackSource::Substitute;
        stream.push(track);
        previous
    }

    /// Drop the stream, returning its tracks so the caller can stop them.
    pub(crate) fn take(&mut self) -> Vec<LocalTrack> {
        self.audio_enabled = false;
        self.video_enabled = false;
        self.capture_stream.take().unwrap_or_default()
    }
}

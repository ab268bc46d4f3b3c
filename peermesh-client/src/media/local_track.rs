use anyhow::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// An Opus frame that decodes to silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// What happens to a sample written to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outgoing {
    Frame,
    Silence,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Where a local track's frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    /// Placeholder video sent while the camera is off.
    Substitute,
}

struct LocalTrackInner {
    kind: TrackKind,
    source: TrackSource,
    enabled: AtomicBool,
    stopped: AtomicBool,
    stop_notify: Notify,
    samples_written: AtomicU64,
    rtp: Arc<TrackLocalStaticSample>,
}

/// A local media track shared by reference between the local stream and
/// every session's outgoing sender. Cloning is cheap and yields the same track.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<LocalTrackInner>,
}

impl LocalTrack {
    pub fn new(
        kind: TrackKind,
        source: TrackSource,
        codec: RTCRtpCodecCapability,
        id: impl Into<String>,
        stream_id: impl Into<String>,
    ) -> Self {
        let rtp = Arc::new(TrackLocalStaticSample::new(
            codec,
            id.into(),
            stream_id.into(),
        ));
        Self {
            inner: Arc::new(LocalTrackInner {
                kind,
                source,
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                stop_notify: Notify::new(),
                samples_written: AtomicU64::new(0),
                rtp,
            }),
        }
    }

    pub fn microphone(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::new(
            TrackKind::Audio,
            TrackSource::Microphone,
            codec_for(TrackKind::Audio),
            id,
            stream_id,
        )
    }

    pub fn camera(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::new(
            TrackKind::Video,
            TrackSource::Camera,
            codec_for(TrackKind::Video),
            id,
            stream_id,
        )
    }

    pub fn id(&self) -> &str {
        self.inner.rtp.id()
    }

    pub fn stream_id(&self) -> &str {
        self.inner.rtp.stream_id()
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn source(&self) -> TrackSource {
        self.inner.source
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Stop producing frames. Idempotent.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            self.inner.stop_notify.notify_waiters();
        }
    }

    /// Resolves once [`LocalTrack::stop`] has been called.
    pub async fn stopped(&self) {
        let notified = self.inner.stop_notify.notified();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }

    /// Feed one encoded frame. A muted audio track sends Opus silence in
    /// its place; a disabled video track drops it. Stopped tracks drop
    /// everything but stay bound to their senders.
    pub async fn write_sample(&self, sample: &Sample) -> Result<()> {
        match self.outgoing() {
            Outgoing::Drop => return Ok(()),
            Outgoing::Frame => self.inner.rtp.write_sample(sample).await?,
            Outgoing::Silence => self.inner.rtp.write_sample(&silence_for(sample)).await?,
        }
        self.inner.samples_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn outgoing(&self) -> Outgoing {
        if self.is_stopped() {
            return Outgoing::Drop;
        }
        match (self.is_enabled(), self.kind()) {
            (true, _) => Outgoing::Frame,
            (false, TrackKind::Audio) => Outgoing::Silence,
            (false, TrackKind::Video) => Outgoing::Drop,
        }
    }

    /// Samples handed to the RTP track so far.
    pub fn samples_written(&self) -> u64 {
        self.inner.samples_written.load(Ordering::Relaxed)
    }

    pub fn rtp_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.rtp.clone()
    }

    pub fn same_track(&self, other: &LocalTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("source", &self.source())
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .field("samples_written", &self.samples_written())
            .finish()
    }
}

/// Opus silence with the timing of `sample`.
fn silence_for(sample: &Sample) -> Sample {
    Sample {
        data: Bytes::from_static(&OPUS_SILENCE),
        timestamp: sample.timestamp,
        duration: sample.duration,
        packet_timestamp: sample.packet_timestamp,
        prev_dropped_packets: sample.prev_dropped_packets,
        prev_padding_packets: sample.prev_padding_packets,
    }
}

pub fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    let mime_type = match kind {
        TrackKind::Audio => MIME_TYPE_OPUS,
        TrackKind::Video => MIME_TYPE_VP8,
    };
    RTCRtpCodecCapability {
        mime_type: mime_type.to_owned(),
        ..Default::default()
    }
}

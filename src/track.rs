//! Per-soundscape playback state owned by the engine.

use tracing::warn;

use crate::graph::Handle;
use crate::node::NodeId;
use crate::noise::Soundscape;
use crate::nodes::{GainMessage, GainProbe};

/// One looping soundscape: a [`BufferSource`](crate::nodes::BufferSource)
/// feeding its own [`Gain`](crate::nodes::Gain), which feeds the master mixer.
///
/// Tracks are owned by the [`Engine`](crate::Engine); callers only get shared
/// references for inspection.
pub struct Track {
    id: String,
    soundscape: Soundscape,
    volume: f32,
    generation: u64,
    pub(crate) source: NodeId,
    pub(crate) gain: Handle<GainMessage>,
    probe: GainProbe,
    // Latest automation that didn't fit in the gain's queue
    pending: Option<GainMessage>,
}

impl Track {
    pub(crate) fn new(
        id: String,
        soundscape: Soundscape,
        volume: f32,
        generation: u64,
        source: NodeId,
        gain: Handle<GainMessage>,
        probe: GainProbe,
    ) -> Self {
        Self {
            id,
            soundscape,
            volume,
            generation,
            source,
            gain,
            probe,
            pending: None,
        }
    }

    /// The id the track was requested under (may be unknown to [`Soundscape`])
    pub fn id(&self) -> &str {
        &self.id
    }

    /// What is actually playing; [`Soundscape::White`] for unknown ids
    pub fn soundscape(&self) -> Soundscape {
        self.soundscape
    }

    /// Last requested logical volume in [0, 1], before attenuation
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Unique per started track; a restart of the same id gets a new generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Gain currently applied on the audio path (after attenuation)
    pub fn level(&self) -> f32 {
        self.probe.get()
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Queue an automation message, parking it if the queue is full.
    ///
    /// Every gain message replaces whatever automation came before, so only the
    /// newest parked message matters.
    pub(crate) fn automate(&mut self, msg: GainMessage) {
        self.pending = None;
        if let Err(msg) = self.gain.send(msg) {
            warn!(track = %self.id, "gain queue full, retrying next block");
            self.pending = Some(msg);
        }
    }

    /// Retry a parked message
    pub(crate) fn flush(&mut self) {
        if let Some(msg) = self.pending.take() {
            if let Err(msg) = self.gain.send(msg) {
                self.pending = Some(msg);
            }
        }
    }
}

impl core::fmt::Debug for Track {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("soundscape", &self.soundscape)
            .field("volume", &self.volume)
            .field("generation", &self.generation)
            .field("level", &self.level())
            .finish()
    }
}

/// Ticket for a track that is fading out.
///
/// Returned by [`Engine::begin_stop`](crate::Engine::begin_stop). The engine
/// releases the track on its own once the clock passes [`due`](Self::due);
/// handing the ticket to [`Engine::finalize_stop`](crate::Engine::finalize_stop)
/// releases it right away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub(crate) id: String,
    pub(crate) generation: u64,
    pub(crate) due: u64,
}

impl Release {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Engine clock frame at which the track is released
    pub fn due(&self) -> u64 {
        self.due
    }
}

/// A track whose fade-out has been scheduled
pub(crate) struct Stopping {
    pub(crate) track: Track,
    pub(crate) due: u64,
}

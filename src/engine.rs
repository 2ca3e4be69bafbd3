//! The ambient sound engine.

use std::time::Duration;

use dasp_graph::Buffer;
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtrb::RingBuffer;
use tracing::{debug, error, info, warn};

use crate::config::{self, EngineConfig};
use crate::device::{Backend, OutputDevice};
use crate::effects::{Effect, ToneSpec};
use crate::error::EngineError;
use crate::graph::AudioGraph;
use crate::mix::{MixerConfig, SILENCE_ID};
use crate::node::NodeId;
use crate::noise::{NoiseBuffer, Soundscape};
use crate::nodes::{BufferSource, Gain, GainMessage, Mixer, RtrbSink, Tone};
use crate::track::{Release, Stopping, Track};

#[cfg(feature = "cpal_sink")]
use crate::device::CpalBackend;

const BLOCK: u64 = Buffer::LEN as u64;

/// Configured durations converted to frames at the output rate
#[derive(Clone, Copy, Debug)]
struct Timings {
    fade_in: u32,
    fade_out: u32,
    release: u64,
    time_constant: f32,
}

impl Timings {
    fn new(config: &EngineConfig, sample_rate: u32) -> Self {
        let fade_out = config::frames(config.fade_out, sample_rate);
        Self {
            fade_in: saturate(config::frames(config.fade_in, sample_rate)),
            fade_out: saturate(fade_out),
            release: fade_out + config::frames(config.release_margin, sample_rate),
            time_constant: config.volume_time_constant.as_secs_f32() * sample_rate as f32,
        }
    }
}

fn saturate(frames: u64) -> u32 {
    u32::try_from(frames).unwrap_or(u32::MAX)
}

/// Logical volumes live in [0, 1]; NaN means silence.
fn sanitize(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Everything that only exists while an output device is open: the graph, the
/// master bus and the tracks feeding it.
struct Output {
    device: Box<dyn OutputDevice>,
    graph: AudioGraph,
    master: NodeId,
    sample_rate: u32,
    channels: u64,
    ring_frames: u64,
    timings: Timings,
    clock: u64,
    tracks: HashMap<String, Track>,
    stopping: Vec<Stopping>,
    // One-shot tones and the frame at which they are removed
    tones: Vec<(NodeId, u64)>,
}

impl Output {
    fn open(mut device: Box<dyn OutputDevice>, config: &EngineConfig) -> Result<Self, EngineError> {
        let stream = device.config();
        if stream.sample_rate == 0 || stream.channels == 0 {
            return Err(EngineError::Unavailable(format!(
                "device reported {} Hz with {} channels",
                stream.sample_rate, stream.channels
            )));
        }

        let ring_size = stream.ring_size();
        let (producer, consumer) = RingBuffer::<f32>::new(ring_size);
        device.start(consumer)?;

        if device.is_suspended() {
            match device.resume() {
                Ok(()) => info!("output resumed"),
                Err(err) => warn!(error = %err, "output is suspended, playback stays silent until resumed"),
            }
        }

        let channels = stream.channels as usize;
        let mut graph = AudioGraph::new(stream.sample_rate);
        let sink = graph.add(RtrbSink::new(producer, channels));
        let master = graph.add(Mixer::new(channels));
        graph.connect(master.id(), sink.id())?;
        graph.set_terminal(sink.id())?;

        info!(sample_rate = stream.sample_rate, channels, "audio output ready");

        Ok(Self {
            device,
            graph,
            master: master.id(),
            sample_rate: stream.sample_rate,
            channels: channels as u64,
            ring_frames: (ring_size / channels) as u64,
            timings: Timings::new(config, stream.sample_rate),
            clock: 0,
            tracks: HashMap::new(),
            stopping: Vec::new(),
            tones: Vec::new(),
        })
    }

    /// Schedule the fade-out of a live track and move it to the stopping list.
    fn begin_stop(&mut self, id: &str) -> Option<Release> {
        let mut track = self.tracks.remove(id)?;

        // Starts from wherever the gain is when the next block begins
        track.automate(GainMessage::RampTo {
            target: 0.0,
            frames: self.timings.fade_out,
        });

        let due = self.clock + self.timings.release;
        info!(track = id, generation = track.generation(), due, "stopping track");

        let release = Release {
            id: track.id().to_owned(),
            generation: track.generation(),
            due,
        };
        self.stopping.push(Stopping { track, due });
        Some(release)
    }

    fn release(graph: &mut AudioGraph, track: &Track) {
        graph.remove(track.source);
        graph.remove(track.gain.id());
        debug!(track = track.id(), generation = track.generation(), "released track");
    }

    fn add_tone(&mut self, spec: ToneSpec) -> Result<(), EngineError> {
        let tone = self.graph.add_with_queue_size(Tone::new(spec, self.sample_rate), 1);
        if let Err(err) = self.graph.connect(tone.id(), self.master) {
            self.graph.remove(tone.id());
            return Err(err);
        }
        let due = self.clock + config::frames(spec.end(), self.sample_rate) + BLOCK;
        self.tones.push((tone.id(), due));
        Ok(())
    }

    fn process(&mut self) {
        for track in self.tracks.values_mut() {
            track.flush();
        }
        for stopping in self.stopping.iter_mut() {
            stopping.track.flush();
        }

        self.graph.process();
        self.clock += BLOCK;

        let clock = self.clock;
        let graph = &mut self.graph;
        self.stopping.retain(|stopping| {
            if stopping.due > clock {
                return true;
            }
            Self::release(graph, &stopping.track);
            false
        });
        self.tones.retain(|&(tone, due)| {
            if due > clock {
                return true;
            }
            graph.remove(tone);
            false
        });
    }
}

/// Plays any number of looping soundscapes at once, plus one-shot tones.
///
/// The engine owns a single audio graph: every track is a looping
/// [`BufferSource`] feeding its own [`Gain`], and every gain and tone feeds one
/// master [`Mixer`] that renders into the output device's ring buffer.
///
/// Nothing here returns an error or panics on a missing or broken output
/// device: failures are logged through `tracing` and the operation becomes a
/// no-op. The output is opened lazily on first use and reopened on a later
/// call if opening failed.
///
/// # Rendering
///
/// The engine renders audio itself, one 64-frame block per [`process`](Self::process)
/// call, and counts rendered frames on its clock. Fades and releases are
/// scheduled on that clock. For real-time playback call
/// [`render_available`](Self::render_available) in a loop; for offline use
/// call [`render_for`](Self::render_for).
///
/// ```
/// use std::time::Duration;
/// use lull::{device::Offline, Engine, EngineConfig, MixerConfig};
///
/// let output = Offline::new(8_000, 2);
/// let mut engine = Engine::with_config(output.clone(), EngineConfig::default().with_seed(3));
///
/// let mix: MixerConfig = "rain=0.6,brown=0.3".parse().unwrap();
/// engine.apply_mixer_config(&mix);
/// assert_eq!(engine.track_ids(), ["brown", "rain"]);
///
/// engine.stop_all();
/// engine.render_for(Duration::from_millis(400));
/// assert_eq!(engine.track_count(), 0);
/// assert!(engine.stopping().is_empty());
/// ```
pub struct Engine {
    backend: Box<dyn Backend>,
    config: EngineConfig,
    rng: StdRng,
    output: Option<Output>,
    next_generation: u64,
}

impl Engine {
    /// Create an engine with the default [`EngineConfig`].
    ///
    /// The backend is not opened until the engine is first used (or
    /// [`init`](Self::init) is called).
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: impl Backend + 'static, config: EngineConfig) -> Self {
        for warning in config.timing_warnings() {
            warn!(warning, "engine timings may click or feel abrupt");
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            backend: Box::new(backend),
            config,
            rng,
            output: None,
            next_generation: 0,
        }
    }

    /// Create an engine on the system's default output device, opened right away.
    #[cfg(feature = "cpal_sink")]
    pub fn default_output() -> Self {
        let mut engine = Self::new(CpalBackend::new());
        engine.init();
        engine
    }

    /// Open the output if it isn't open yet, and resume it if it's suspended.
    ///
    /// Safe to call any number of times.
    pub fn init(&mut self) {
        let Some(output) = self.output.as_mut() else {
            self.open();
            return;
        };

        if output.device.is_suspended() {
            match output.device.resume() {
                Ok(()) => info!("output resumed"),
                Err(err) => warn!(error = %err, "could not resume output"),
            }
        }
    }

    fn open(&mut self) {
        let opened = self
            .backend
            .open()
            .and_then(|device| Output::open(device, &self.config));

        match opened {
            Ok(output) => self.output = Some(output),
            Err(err) => warn!(error = %err, "audio output unavailable, sound is disabled"),
        }
    }

    /// Start (or restart) a looping soundscape at `volume` in [0, 1], fading in.
    ///
    /// A track already playing under `id` is faded out and released first.
    /// Unknown ids play white noise; `"none"` is ignored.
    pub fn start_track(&mut self, id: &str, volume: f32) {
        if id == SILENCE_ID {
            debug!("ignoring start of the silent soundscape");
            return;
        }

        self.init();
        if self.output.is_none() {
            debug!(soundscape = id, "no output, track not started");
            return;
        }

        if let Err(err) = self.try_start_track(id, volume) {
            error!(soundscape = id, error = %err, "failed to start track");
        }
    }

    fn try_start_track(&mut self, id: &str, volume: f32) -> Result<(), EngineError> {
        let Engine {
            config,
            rng,
            output,
            next_generation,
            ..
        } = self;
        let Some(output) = output.as_mut() else {
            return Ok(());
        };

        if output.tracks.contains_key(id) {
            output.begin_stop(id);
        }

        let volume = sanitize(volume);
        let soundscape = Soundscape::from_id(id);
        let buffer = NoiseBuffer::generate(
            soundscape,
            output.sample_rate,
            config.loop_length,
            config.loop_crossfade,
            rng,
        )?;

        let gain = Gain::new(0.0).ramp_to(volume * config.attenuation, output.timings.fade_in);
        let probe = gain.probe();

        let source = output.graph.add_with_queue_size(BufferSource::new(buffer), config.queue_size);
        let gain = output.graph.add_with_queue_size(gain, config.queue_size);

        let master = output.master;
        let wired = output
            .graph
            .connect(source.id(), gain.id())
            .and_then(|()| output.graph.connect(gain.id(), master));
        if let Err(err) = wired {
            output.graph.remove(source.id());
            output.graph.remove(gain.id());
            return Err(err);
        }

        *next_generation += 1;
        info!(track = id, %soundscape, volume, generation = *next_generation, "started track");

        let track = Track::new(id.to_owned(), soundscape, volume, *next_generation, source.id(), gain, probe);
        output.tracks.insert(id.to_owned(), track);
        Ok(())
    }

    /// Fade a track out and release it. No-op if `id` isn't playing.
    pub fn stop_track(&mut self, id: &str) {
        self.begin_stop(id);
    }

    /// Smoothly move a playing track to a new volume in [0, 1].
    ///
    /// No-op if `id` isn't playing.
    pub fn update_track_volume(&mut self, id: &str, volume: f32) {
        let attenuation = self.config.attenuation;
        let Some(output) = self.output.as_mut() else {
            return;
        };
        let Some(track) = output.tracks.get_mut(id) else {
            debug!(track = id, "volume change for a track that isn't playing");
            return;
        };

        let volume = sanitize(volume);
        if track.volume() == volume {
            return;
        }

        track.set_volume(volume);
        track.automate(GainMessage::Approach {
            target: volume * attenuation,
            time_constant: output.timings.time_constant,
        });
    }

    /// Converge the playing tracks on `mix`.
    ///
    /// Tracks missing from the mix are faded out first, then the remaining
    /// entries are retargeted if already playing or started otherwise.
    pub fn apply_mixer_config(&mut self, mix: &MixerConfig) {
        let mut stale: Vec<String> = self
            .output
            .as_ref()
            .map(|output| output.tracks.keys().filter(|id| !mix.is_active(id)).cloned().collect())
            .unwrap_or_default();
        stale.sort_unstable();

        debug!(stop = ?stale, desired = ?mix.active().collect::<Vec<_>>(), "applying mixer config");

        for id in &stale {
            self.begin_stop(id);
        }

        for (id, volume) in mix.active() {
            if self.is_active(id) {
                self.update_track_volume(id, volume);
            } else {
                self.start_track(id, volume);
            }
        }
    }

    /// Fade out every playing track.
    pub fn stop_all(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        let mut ids: Vec<String> = output.tracks.keys().cloned().collect();
        ids.sort_unstable();
        for id in ids {
            output.begin_stop(&id);
        }
    }

    /// Stop everything, then play a single soundscape.
    pub fn start_ambient(&mut self, id: &str, volume: f32) {
        self.stop_all();
        self.start_track(id, volume);
    }

    /// Same as [`stop_all`](Self::stop_all).
    pub fn stop_ambient(&mut self) {
        self.stop_all();
    }

    /// Move every playing track to the same volume.
    pub fn update_ambient_volume(&mut self, volume: f32) {
        let ids: Vec<String> = self.track_ids().into_iter().map(str::to_owned).collect();
        for id in ids {
            self.update_track_volume(&id, volume);
        }
    }

    /// First half of a stop: schedule the fade-out.
    ///
    /// The returned ticket says when the track's nodes will be released. The
    /// engine releases them on its own once its clock gets there; pass the
    /// ticket to [`finalize_stop`](Self::finalize_stop) to release them early.
    pub fn begin_stop(&mut self, id: &str) -> Option<Release> {
        let release = self.output.as_mut().and_then(|output| output.begin_stop(id));
        if release.is_none() {
            debug!(track = id, "stop for a track that isn't playing");
        }
        release
    }

    /// Second half of a stop: remove the track's nodes from the graph.
    ///
    /// Returns `false` if the track was already released.
    pub fn finalize_stop(&mut self, release: &Release) -> bool {
        let Some(output) = self.output.as_mut() else {
            return false;
        };
        let Some(index) = output
            .stopping
            .iter()
            .position(|stopping| stopping.track.generation() == release.generation)
        else {
            return false;
        };

        let stopping = output.stopping.swap_remove(index);
        Output::release(&mut output.graph, &stopping.track);
        true
    }

    /// Play a one-shot tone on top of the ambient mix.
    pub fn play_tone(&mut self, spec: ToneSpec) {
        self.init();
        let Some(output) = self.output.as_mut() else {
            debug!("no output, tone skipped");
            return;
        };
        if let Err(err) = output.add_tone(spec) {
            warn!(error = %err, frequency = spec.frequency, "failed to play tone");
        }
    }

    pub fn play_effect(&mut self, effect: Effect) {
        for spec in effect.tones() {
            self.play_tone(spec);
        }
    }

    /// Task-completion chime
    pub fn play_complete(&mut self) {
        self.play_effect(Effect::Complete);
    }

    /// End-of-timer beeps
    pub fn play_alarm(&mut self) {
        self.play_effect(Effect::Alarm);
    }

    /// Render one block of audio and release anything that is due.
    ///
    /// Does nothing (the clock stands still) while there is no output or the
    /// output is suspended.
    pub fn process(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if output.device.is_suspended() {
            return;
        }
        output.process();
    }

    /// Render as many blocks as fit in the output's ring buffer right now.
    ///
    /// Returns the number of blocks rendered. Call this periodically (every few
    /// milliseconds) to keep a real-time device fed.
    pub fn render_available(&mut self) -> usize {
        let Some(output) = self.output.as_ref() else {
            return 0;
        };
        let played = output.device.samples_consumed() / output.channels;
        let budget = played + output.ring_frames;

        let mut blocks = 0;
        while self.clock() + BLOCK <= budget {
            if !self.advance() {
                break;
            }
            blocks += 1;
        }
        blocks
    }

    /// Render `duration` worth of audio (rounded up to whole blocks).
    ///
    /// Returns the number of blocks rendered, which is zero while the output is
    /// unavailable or suspended.
    pub fn render_for(&mut self, duration: Duration) -> usize {
        let Some(sample_rate) = self.sample_rate() else {
            return 0;
        };
        let blocks = config::frames(duration, sample_rate).div_ceil(BLOCK);

        let mut rendered = 0;
        for _ in 0..blocks {
            if !self.advance() {
                break;
            }
            rendered += 1;
        }
        rendered
    }

    fn advance(&mut self) -> bool {
        let before = self.clock();
        self.process();
        self.clock() > before
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether an output device is open
    pub fn is_available(&self) -> bool {
        self.output.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.output.as_ref().is_some_and(|output| output.device.is_suspended())
    }

    /// Output sample rate, once a device is open
    pub fn sample_rate(&self) -> Option<u32> {
        self.output.as_ref().map(|output| output.sample_rate)
    }

    /// Frames rendered since the output was opened
    pub fn clock(&self) -> u64 {
        self.output.as_ref().map_or(0, |output| output.clock)
    }

    /// Whether a live (not fading out) track is playing under `id`
    pub fn is_active(&self, id: &str) -> bool {
        self.track(id).is_some()
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.output.as_ref()?.tracks.get(id)
    }

    /// Ids of live tracks, sorted
    pub fn track_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .output
            .as_ref()
            .map(|output| output.tracks.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn track_count(&self) -> usize {
        self.output.as_ref().map_or(0, |output| output.tracks.len())
    }

    /// Ids of tracks that are fading out and not yet released, in stop order
    pub fn stopping(&self) -> Vec<&str> {
        self.output
            .as_ref()
            .map(|output| output.stopping.iter().map(|s| s.track.id()).collect())
            .unwrap_or_default()
    }

    /// Nodes currently in the graph, including the master bus and the sink
    pub fn node_count(&self) -> usize {
        self.output.as_ref().map_or(0, |output| output.graph.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Offline;

    fn engine() -> (Engine, Offline) {
        let output = Offline::new(8_000, 2);
        let config = EngineConfig::default()
            .with_seed(11)
            .with_loop_length(Duration::from_millis(500));
        (Engine::with_config(output.clone(), config), output)
    }

    #[test]
    fn output_opens_lazily_once() {
        let (mut engine, output) = engine();
        assert!(!engine.is_available());
        engine.stop_all();
        engine.update_track_volume("rain", 0.3);
        assert_eq!(output.open_count(), 0);

        engine.start_track("rain", 0.5);
        engine.init();
        engine.start_track("wind", 0.5);
        assert_eq!(output.open_count(), 1);
        assert_eq!(engine.sample_rate(), Some(8_000));
        // sink, master, and a source and gain per track
        assert_eq!(engine.node_count(), 6);
    }

    #[test]
    fn fade_in_reaches_the_attenuated_volume() {
        let (mut engine, _output) = engine();
        engine.start_track("brown", 0.5);
        engine.render_for(Duration::from_millis(100));
        let partial = engine.track("brown").unwrap().level();
        assert!(partial > 0.0 && partial < 0.1);

        engine.render_for(Duration::from_millis(500));
        assert!((engine.track("brown").unwrap().level() - 0.1).abs() < 1.0e-6);
    }

    #[test]
    fn volume_changes_settle_quickly() {
        let (mut engine, _output) = engine();
        engine.start_track("pink", 1.0);
        engine.render_for(Duration::from_millis(600));

        engine.update_track_volume("pink", 0.25);
        assert_eq!(engine.track("pink").unwrap().volume(), 0.25);
        engine.render_for(Duration::from_millis(100));
        assert!((engine.track("pink").unwrap().level() - 0.05).abs() < 1.0e-3);
    }

    #[test]
    fn volumes_are_clamped() {
        let (mut engine, _output) = engine();
        engine.start_track("fire", 3.0);
        assert_eq!(engine.track("fire").unwrap().volume(), 1.0);
        engine.update_track_volume("fire", f32::NAN);
        assert_eq!(engine.track("fire").unwrap().volume(), 0.0);
        engine.update_track_volume("fire", -1.0);
        assert_eq!(engine.track("fire").unwrap().volume(), 0.0);
    }

    #[test]
    fn none_never_becomes_a_track() {
        let (mut engine, output) = engine();
        engine.start_track("none", 0.8);
        engine.apply_mixer_config(&MixerConfig::new().with("none", 1.0));
        assert_eq!(engine.track_count(), 0);
        assert_eq!(output.open_count(), 0);
    }

    #[test]
    fn finalize_releases_early_and_only_once() {
        let (mut engine, _output) = engine();
        engine.start_track("lofi", 0.4);
        let before = engine.node_count();

        let release = engine.begin_stop("lofi").unwrap();
        assert_eq!(release.id(), "lofi");
        assert_eq!(release.due(), 2_400 + 400);
        assert_eq!(engine.node_count(), before);

        assert!(engine.finalize_stop(&release));
        assert!(!engine.finalize_stop(&release));
        assert_eq!(engine.node_count(), before - 2);
        assert!(engine.begin_stop("lofi").is_none());
    }

    #[test]
    fn suspended_output_freezes_the_clock() {
        let (mut engine, output) = engine();
        engine.start_track("rain", 0.5);
        output.suspend();
        output.set_resume_allowed(false);

        assert_eq!(engine.render_for(Duration::from_millis(100)), 0);
        assert_eq!(engine.clock(), 0);

        engine.init();
        assert!(engine.is_suspended());

        output.set_resume_allowed(true);
        engine.init();
        assert!(!engine.is_suspended());
        assert_eq!(engine.render_for(Duration::from_millis(8)), 1);
        assert_eq!(engine.clock(), BLOCK);
    }

    #[test]
    fn tones_are_removed_after_they_finish() {
        let (mut engine, _output) = engine();
        engine.init();
        let idle = engine.node_count();

        engine.play_alarm();
        assert_eq!(engine.node_count(), idle + 3);
        engine.render_for(Duration::from_millis(600));
        assert_eq!(engine.node_count(), idle);

        engine.play_complete();
        assert_eq!(engine.node_count(), idle + 2);
        assert_eq!(engine.track_count(), 0);
    }

    #[test]
    fn render_available_fills_the_ring() {
        let (mut engine, output) = engine();
        engine.start_track("waves", 0.7);

        // 8192-sample ring, two channels
        assert_eq!(engine.render_available(), 4096 / Buffer::LEN);
        assert_eq!(engine.render_available(), 0);

        let drained = output.drain();
        assert_eq!(drained.len(), 8192);
        assert!(drained.iter().all(|s| s.abs() <= 1.0));
        assert_eq!(engine.render_available(), 4096 / Buffer::LEN);
    }
}

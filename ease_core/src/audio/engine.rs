//! Therapeutic audio engine.
//!
//! Owns the output device and the mixing graph, and keeps a registry of live
//! playback sessions. Each session owns its voices in the graph, so fading
//! or stopping one never touches another. Auto-stops, voice release after a
//! fade, and the steps of the pain-relief sequence all run on the engine's
//! timer queue, which the host drives with [`AudioEngine::advance`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::buffer::{tone_buffer, AudioBuffer};
use super::device::{AudioDevice, DeviceState, OfflineDevice};
use super::dsp::{GainParam, RampShape};
use super::graph::{
    lock, AudioGraph, Branch, BufferSource, NoiseSource, Oscillator, Route, SharedGraph, VoiceId,
};
use super::noise::nature_bed;
use super::tones::{HealingTone, NatureSound, PAIN_RELIEF_SEQUENCE};
use crate::config::AudioConfig;
use crate::timer::{TimerId, Timers};

/// Binaural channel gain at the start of the fade-in
pub const BINAURAL_START_GAIN: f32 = 0.2;
/// Binaural channel gain once the fade-in completes
pub const BINAURAL_GAIN: f32 = 0.3;
pub const BINAURAL_RAMP_SECONDS: f64 = 2.0;

pub const DEFAULT_BINAURAL_BASE_HZ: f32 = 200.0;
pub const DEFAULT_BINAURAL_BEAT_HZ: f32 = 10.0;
pub const DEFAULT_SESSION_SECONDS: f64 = 300.0;

/// Opaque identifier of one live playback session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionHandle(u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSessionKind {
    Healing,
    Binaural,
    Nature,
    Sequence,
}

/// Snapshot of a live session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionInfo {
    pub handle: SessionHandle,
    pub kind: AudioSessionKind,
    pub label: String,
    /// Settled gain of each branch the session currently owns
    pub levels: Vec<f32>,
    /// Index into the pain-relief sequence, for sequence sessions
    pub sequence_step: Option<usize>,
}

#[derive(Debug)]
enum EngineTask {
    AutoStop(SessionHandle),
    Release(Vec<VoiceId>),
    SequenceNext(SessionHandle),
}

#[derive(Debug)]
struct LiveSession {
    kind: AudioSessionKind,
    label: String,
    voices: Vec<VoiceId>,
    auto_stop: Option<TimerId>,
    sequence_step: Option<usize>,
    next_step: Option<TimerId>,
}

/// Convert caller-supplied seconds into a timer delay
fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

pub struct AudioEngine {
    config: AudioConfig,
    device: Box<dyn AudioDevice>,
    graph: Option<SharedGraph>,
    tone_buffers: HashMap<HealingTone, AudioBuffer>,
    sessions: BTreeMap<SessionHandle, LiveSession>,
    timers: Timers<EngineTask>,
    next_handle: u64,
    rng: StdRng,
}

impl fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEngine")
            .field("initialized", &self.graph.is_some())
            .field("device_state", &self.device.state())
            .field("sessions", &self.sessions)
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}

impl AudioEngine {
    pub fn new(config: AudioConfig, device: Box<dyn AudioDevice>) -> Self {
        let rng = match config.noise_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            device,
            graph: None,
            tone_buffers: HashMap::new(),
            sessions: BTreeMap::new(),
            timers: Timers::new(),
            next_handle: 1,
            rng,
        }
    }

    /// Engine over an [`OfflineDevice`] at the configured sample rate
    pub fn offline(config: AudioConfig) -> Self {
        let device = OfflineDevice::new(config.sample_rate);
        Self::new(config, Box::new(device))
    }

    /// Engine playing through the default system output
    #[cfg(feature = "cpal-output")]
    pub fn with_default_output(config: AudioConfig) -> Self {
        Self::new(config, Box::new(super::device::CpalDevice::new()))
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Acquire the output device and precompute the tone buffers
    ///
    /// Idempotent. Returns false when the device cannot be opened; the
    /// engine then stays degraded and every `play_*` call yields `None`.
    pub fn initialize(&mut self) -> bool {
        if self.graph.is_some() {
            return true;
        }

        let master = self.config.master_volume.clamp(0.0, 1.0);
        let graph = AudioGraph::new(self.config.sample_rate, master).shared();

        let info = match self.device.open(Arc::clone(&graph)) {
            Ok(info) => info,
            Err(e) => {
                error!("Audio output unavailable, continuing without sound: {}", e);
                return false;
            }
        };
        lock(&graph).set_sample_rate(info.sample_rate);

        self.tone_buffers = HealingTone::ALL
            .into_iter()
            .map(|tone| {
                let buffer = tone_buffer(
                    tone.frequency(),
                    self.config.tone_seconds,
                    self.config.tone_fade_seconds,
                    info.sample_rate,
                );
                (tone, buffer)
            })
            .collect();
        self.graph = Some(graph);

        info!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            tones = self.tone_buffers.len(),
            "Audio engine initialized"
        );
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.graph.is_some()
    }

    pub fn device_state(&self) -> DeviceState {
        self.device.state()
    }

    /// Re-activate output that the platform suspended; safe to repeat
    pub fn resume_context(&mut self) -> bool {
        if self.graph.is_none() {
            return false;
        }
        match self.device.resume() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to resume audio output: {}", e);
                false
            }
        }
    }

    /// Stop everything, release every voice and close the device
    pub fn shutdown(&mut self) {
        let stopped = self.sessions.len();
        self.sessions.clear();
        self.timers.clear();
        if let Some(graph) = self.graph.take() {
            lock(&graph).clear();
        }
        self.device.close();
        self.tone_buffers.clear();
        info!(stopped, "Audio engine shut down");
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Move the engine clock forward, firing auto-stops, releases and
    /// sequence steps that fall due
    pub fn advance(&mut self, elapsed: Duration) {
        let until = self.timers.now().saturating_add(elapsed);
        while let Some((_, task)) = self.timers.pop_due(until) {
            self.fire(task);
        }
        self.timers.finish(until);
    }

    fn fire(&mut self, task: EngineTask) {
        match task {
            EngineTask::AutoStop(handle) => {
                if let Some(session) = self.sessions.get_mut(&handle) {
                    session.auto_stop = None;
                }
                debug!(%handle, "Auto-stopping audio session");
                self.stop_session(handle);
            }
            EngineTask::Release(voices) => {
                if let Some(graph) = &self.graph {
                    let mut graph = lock(graph);
                    for voice in voices {
                        graph.remove_voice(voice);
                    }
                }
            }
            EngineTask::SequenceNext(handle) => self.advance_sequence(handle),
        }
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Loop the named tone (e.g. `528Hz`) for `seconds`
    pub fn play_healing_frequency(&mut self, tone: &str, seconds: f64) -> Option<SessionHandle> {
        match HealingTone::from_label(tone) {
            Some(tone) => self.play_tone(tone, seconds),
            None => {
                warn!("Unknown healing tone: {}", tone);
                None
            }
        }
    }

    pub fn play_tone(&mut self, tone: HealingTone, seconds: f64) -> Option<SessionHandle> {
        let voice = self.tone_voice(tone)?;
        let handle = self.register(AudioSessionKind::Healing, tone.label(), vec![voice], seconds);
        info!(%handle, %tone, seconds, "Healing tone started");
        Some(handle)
    }

    /// Left ear at `base_hz`, right ear at `base_hz + beat_hz`
    pub fn play_binaural_beats(
        &mut self,
        base_hz: f32,
        beat_hz: f32,
        seconds: f64,
    ) -> Option<SessionHandle> {
        let graph = Arc::clone(self.graph.as_ref()?);
        let right_hz = base_hz + beat_hz;
        if !(base_hz > 0.0) || !right_hz.is_finite() || !(right_hz > 0.0) {
            warn!(base_hz, beat_hz, "Invalid binaural frequencies");
            return None;
        }

        let voice = {
            let mut graph = lock(&graph);
            let rate = graph.sample_rate();
            let voice = graph.add_voice(vec![
                Branch::new(
                    Oscillator::new(base_hz, rate),
                    GainParam::new(BINAURAL_START_GAIN),
                    Route::Left,
                ),
                Branch::new(
                    Oscillator::new(right_hz, rate),
                    GainParam::new(BINAURAL_START_GAIN),
                    Route::Right,
                ),
            ]);
            graph.ramp_voice(voice, BINAURAL_GAIN, BINAURAL_RAMP_SECONDS, RampShape::Exponential);
            voice
        };

        let label = format!("{}Hz + {}Hz beat", base_hz, beat_hz);
        let handle = self.register(AudioSessionKind::Binaural, &label, vec![voice], seconds);
        info!(%handle, base_hz, beat_hz, seconds, "Binaural beats started");
        Some(handle)
    }

    /// Loop one of `rain`, `ocean` or `forest` for `seconds`
    pub fn play_nature_sounds(&mut self, kind: &str, seconds: f64) -> Option<SessionHandle> {
        match NatureSound::from_name(kind) {
            Some(kind) => self.play_nature(kind, seconds),
            None => {
                warn!("Unknown nature sound: {}", kind);
                None
            }
        }
    }

    pub fn play_nature(&mut self, kind: NatureSound, seconds: f64) -> Option<SessionHandle> {
        let graph = Arc::clone(self.graph.as_ref()?);

        // Build the bed outside the lock the output callback takes
        let rate = lock(&graph).sample_rate();
        let source = NoiseSource::new(nature_bed(kind, &mut self.rng, rate), rate);

        let voice = {
            let mut graph = lock(&graph);
            let voice =
                graph.add_voice(vec![Branch::new(source, GainParam::new(0.0), Route::Stereo)]);
            // Noise has no baked-in envelope, so fade it in
            graph.ramp_voice(
                voice,
                self.config.session_gain,
                self.config.fade_out_seconds,
                RampShape::Linear,
            );
            voice
        };

        let handle = self.register(AudioSessionKind::Nature, kind.as_str(), vec![voice], seconds);
        info!(%handle, %kind, seconds, "Nature sound started");
        Some(handle)
    }

    /// Play the fixed tone sequence back to back under a single handle
    pub fn play_pain_relief_sequence(&mut self) -> Option<SessionHandle> {
        let (first, seconds) = PAIN_RELIEF_SEQUENCE[0];
        let voice = self.tone_voice(first)?;

        let handle = self.next_handle();
        let next_step = self.timers.schedule(
            Duration::from_secs(u64::from(seconds)),
            EngineTask::SequenceNext(handle),
        );
        self.sessions.insert(
            handle,
            LiveSession {
                kind: AudioSessionKind::Sequence,
                label: "pain relief sequence".into(),
                voices: vec![voice],
                auto_stop: None,
                sequence_step: Some(0),
                next_step: Some(next_step),
            },
        );
        info!(%handle, tone = %first, "Pain relief sequence started");
        Some(handle)
    }

    fn advance_sequence(&mut self, handle: SessionHandle) {
        let Some(session) = self.sessions.get_mut(&handle) else {
            return;
        };
        session.next_step = None;

        let step = session.sequence_step.map_or(0, |s| s + 1);
        let Some(&(tone, seconds)) = PAIN_RELIEF_SEQUENCE.get(step) else {
            debug!(%handle, "Pain relief sequence finished");
            self.stop_session(handle);
            return;
        };

        let previous = std::mem::take(&mut session.voices);
        self.fade_and_release(previous);

        let voice = self.tone_voice(tone);
        let next_step = self.timers.schedule(
            Duration::from_secs(u64::from(seconds)),
            EngineTask::SequenceNext(handle),
        );
        if let Some(session) = self.sessions.get_mut(&handle) {
            session.voices.extend(voice);
            session.sequence_step = Some(step);
            session.next_step = Some(next_step);
        }
        debug!(%handle, step, %tone, "Pain relief sequence advanced");
    }

    // ------------------------------------------------------------------
    // Stopping and volume
    // ------------------------------------------------------------------

    /// Fade out and release everything the session owns
    ///
    /// Returns false for handles that are unknown or already stopped.
    pub fn stop_session(&mut self, handle: SessionHandle) -> bool {
        let Some(session) = self.sessions.remove(&handle) else {
            return false;
        };
        for timer in [session.auto_stop, session.next_step].into_iter().flatten() {
            self.timers.cancel(timer);
        }
        self.fade_and_release(session.voices);
        info!(%handle, kind = ?session.kind, "Audio session stopped");
        true
    }

    pub fn stop_all_sessions(&mut self) {
        let handles: Vec<_> = self.sessions.keys().copied().collect();
        for handle in handles {
            self.stop_session(handle);
        }
    }

    /// Clamp `level` to [0, 1] and apply it to the master bus
    pub fn set_master_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.config.master_volume = level;
        if let Some(graph) = &self.graph {
            lock(graph).set_master(level);
        }
        debug!(level, "Master volume set");
        level
    }

    pub fn master_volume(&self) -> f32 {
        self.config.master_volume
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn is_live(&self, handle: SessionHandle) -> bool {
        self.sessions.contains_key(&handle)
    }

    pub fn live_sessions(&self) -> Vec<SessionHandle> {
        self.sessions.keys().copied().collect()
    }

    pub fn session_info(&self, handle: SessionHandle) -> Option<SessionInfo> {
        let session = self.sessions.get(&handle)?;
        let levels = match &self.graph {
            Some(graph) => {
                let graph = lock(graph);
                session
                    .voices
                    .iter()
                    .filter_map(|voice| graph.voice_levels(*voice))
                    .flatten()
                    .collect()
            }
            None => Vec::new(),
        };
        Some(SessionInfo {
            handle,
            kind: session.kind,
            label: session.label.clone(),
            levels,
            sequence_step: session.sequence_step,
        })
    }

    pub fn graph(&self) -> Option<&SharedGraph> {
        self.graph.as_ref()
    }

    /// Pull interleaved stereo frames from the graph by hand
    ///
    /// For devices that do not pull on their own. Returns false, leaving
    /// `out` silent, while the engine is not initialized.
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        match &self.graph {
            Some(graph) => {
                lock(graph).render(out);
                true
            }
            None => {
                out.fill(0.0);
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn next_handle(&mut self) -> SessionHandle {
        let handle = SessionHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn tone_voice(&self, tone: HealingTone) -> Option<VoiceId> {
        let graph = self.graph.as_ref()?;
        let buffer = self.tone_buffers.get(&tone)?.clone();
        let voice = lock(graph).add_voice(vec![Branch::new(
            BufferSource::new(buffer),
            GainParam::new(self.config.session_gain),
            Route::Stereo,
        )]);
        Some(voice)
    }

    fn register(
        &mut self,
        kind: AudioSessionKind,
        label: &str,
        voices: Vec<VoiceId>,
        seconds: f64,
    ) -> SessionHandle {
        let handle = self.next_handle();
        let auto_stop = self
            .timers
            .schedule(seconds_to_duration(seconds), EngineTask::AutoStop(handle));
        self.sessions.insert(
            handle,
            LiveSession {
                kind,
                label: label.to_string(),
                voices,
                auto_stop: Some(auto_stop),
                sequence_step: None,
                next_step: None,
            },
        );
        handle
    }

    fn fade_and_release(&mut self, voices: Vec<VoiceId>) {
        if voices.is_empty() {
            return;
        }
        let Some(graph) = &self.graph else {
            return;
        };
        {
            let mut graph = lock(graph);
            for voice in &voices {
                graph.ramp_voice(*voice, 0.0, self.config.fade_out_seconds, RampShape::Exponential);
            }
        }
        self.timers.schedule(
            seconds_to_duration(self.config.fade_out_seconds),
            EngineTask::Release(voices),
        );
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if self.graph.is_some() {
            self.shutdown();
        }
    }
}

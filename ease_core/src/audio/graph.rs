//! The mixing graph shared between the engine and the output device.
//!
//! A voice is one independently faded unit of sound. It holds one or more
//! branches, each a source feeding its own gain into a stereo route. Every
//! voice sums into the master gain.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::buffer::AudioBuffer;
use super::dsp::{GainParam, RampShape};
use super::noise::{swell_gain, NoiseBed};

/// Anything that produces an endless stream of stereo frames
pub trait Source: Send {
    fn next_frame(&mut self) -> [f32; 2];
}

/// Loops a precomputed buffer forever
#[derive(Debug)]
pub struct BufferSource {
    buffer: AudioBuffer,
    position: usize,
}

impl BufferSource {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }
}

impl Source for BufferSource {
    fn next_frame(&mut self) -> [f32; 2] {
        let frames = self.buffer.frames();
        if frames == 0 {
            return [0.0, 0.0];
        }
        let frame = self.buffer.frame(self.position);
        self.position = (self.position + 1) % frames;
        frame
    }
}

/// Unit-amplitude sine generator
#[derive(Debug)]
pub struct Oscillator {
    phase: f64,
    step: f64,
}

impl Oscillator {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: f64::from(frequency) / f64::from(sample_rate.max(1)),
        }
    }
}

impl Source for Oscillator {
    fn next_frame(&mut self) -> [f32; 2] {
        let sample = (2.0 * std::f64::consts::PI * self.phase).sin() as f32;
        self.phase = (self.phase + self.step).fract();
        [sample, sample]
    }
}

/// Loops a noise bed, applying its swell if it has one
#[derive(Debug)]
pub struct NoiseSource {
    samples: Arc<[f32]>,
    swell_hz: Option<f64>,
    sample_rate: f64,
    position: usize,
    elapsed: u64,
}

impl NoiseSource {
    pub fn new(bed: NoiseBed, sample_rate: u32) -> Self {
        Self {
            samples: Arc::from(bed.samples),
            swell_hz: bed.swell_hz,
            sample_rate: f64::from(sample_rate.max(1)),
            position: 0,
            elapsed: 0,
        }
    }
}

impl Source for NoiseSource {
    fn next_frame(&mut self) -> [f32; 2] {
        if self.samples.is_empty() {
            return [0.0, 0.0];
        }
        let mut sample = self.samples[self.position];
        if let Some(hz) = self.swell_hz {
            sample *= swell_gain(self.elapsed as f64 / self.sample_rate, hz);
        }
        self.position = (self.position + 1) % self.samples.len();
        self.elapsed += 1;
        [sample, sample]
    }
}

/// Which output channels a branch feeds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Stereo,
    Left,
    Right,
}

pub struct Branch {
    source: Box<dyn Source>,
    gain: GainParam,
    route: Route,
}

impl Branch {
    pub fn new(source: impl Source + 'static, gain: GainParam, route: Route) -> Self {
        Self {
            source: Box::new(source),
            gain,
            route,
        }
    }

    pub fn gain(&self) -> &GainParam {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut GainParam {
        &mut self.gain
    }

    pub fn route(&self) -> Route {
        self.route
    }
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("gain", &self.gain)
            .field("route", &self.route)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

#[derive(Debug)]
pub struct AudioGraph {
    sample_rate: u32,
    frames_rendered: u64,
    master: GainParam,
    voices: BTreeMap<VoiceId, Vec<Branch>>,
    next_voice: u64,
}

pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Lock the graph, carrying on with the inner value if a holder panicked
pub fn lock(graph: &SharedGraph) -> MutexGuard<'_, AudioGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AudioGraph {
    pub fn new(sample_rate: u32, master_level: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames_rendered: 0,
            master: GainParam::new(master_level),
            voices: BTreeMap::new(),
            next_voice: 0,
        }
    }

    pub fn shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    /// Seconds of audio rendered so far; the clock ramps are scheduled on
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.sample_rate)
    }

    pub fn add_voice(&mut self, branches: Vec<Branch>) -> VoiceId {
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(id, branches);
        id
    }

    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        self.voices.remove(&id).is_some()
    }

    pub fn has_voice(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Ramp every branch of a voice to `target`, starting now
    pub fn ramp_voice(
        &mut self,
        id: VoiceId,
        target: f32,
        duration: f64,
        shape: RampShape,
    ) -> bool {
        let now = self.current_time();
        let Some(branches) = self.voices.get_mut(&id) else {
            return false;
        };
        for branch in branches.iter_mut() {
            branch.gain.ramp_to(target, now, duration, shape);
        }
        true
    }

    /// Gain each branch of a voice settles at
    pub fn voice_levels(&self, id: VoiceId) -> Option<Vec<f32>> {
        self.voices
            .get(&id)
            .map(|branches| branches.iter().map(|b| b.gain.target()).collect())
    }

    pub fn voice_is_ramping(&self, id: VoiceId) -> bool {
        let now = self.current_time();
        self.voices
            .get(&id)
            .is_some_and(|branches| branches.iter().any(|b| b.gain.is_ramping(now)))
    }

    pub fn set_master(&mut self, level: f32) {
        self.master.set_value(level);
    }

    pub fn master_level(&self) -> f32 {
        self.master.target()
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Fill `out` with interleaved stereo frames; a trailing odd sample is zeroed
    pub fn render(&mut self, out: &mut [f32]) {
        let rate = f64::from(self.sample_rate);
        let mut frames = out.chunks_exact_mut(2);

        for frame in &mut frames {
            let t = self.frames_rendered as f64 / rate;
            let (mut left, mut right) = (0.0_f32, 0.0_f32);

            for branch in self.voices.values_mut().flatten() {
                let [l, r] = branch.source.next_frame();
                let gain = branch.gain.value_at(t);
                match branch.route {
                    Route::Stereo => {
                        left += l * gain;
                        right += r * gain;
                    }
                    Route::Left => left += l * gain,
                    Route::Right => right += r * gain,
                }
            }

            let master = self.master.value_at(t);
            frame[0] = (left * master).clamp(-1.0, 1.0);
            frame[1] = (right * master).clamp(-1.0, 1.0);
            self.frames_rendered += 1;
        }

        for sample in frames.into_remainder() {
            *sample = 0.0;
        }
    }
}

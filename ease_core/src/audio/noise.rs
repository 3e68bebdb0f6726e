//! Noise synthesis for the nature-sound beds.
//!
//! Everything here is a pure function of a random source and a sample rate,
//! so the beds can be checked without an output device.

use rand::Rng;

use super::dsp::{filter_chain, FilterSpec};
use super::tones::NatureSound;

/// Length of a generated bed before it loops
pub const NOISE_BED_SECONDS: f64 = 2.0;

/// Frequency of the ocean swell
pub const OCEAN_SWELL_HZ: f64 = 0.1;

/// Uniform white noise in [-1, 1)
pub fn white_noise<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Leaky-integrated white noise, scaled down to a comfortable level
pub fn brown_noise(white: &[f32]) -> Vec<f32> {
    let mut last = 0.0_f32;
    white
        .iter()
        .map(|&w| {
            let brown = (last + 0.02 * w) / 1.02;
            last = brown;
            brown * 0.3
        })
        .collect()
}

/// Amplitude multiplier of the ocean swell at `t` seconds, between 0.2 and 1.0
pub fn swell_gain(t: f64, hz: f64) -> f32 {
    (0.6 + 0.4 * (2.0 * std::f64::consts::PI * hz * t).sin()) as f32
}

/// A loopable, already-filtered noise buffer
#[derive(Clone, Debug)]
pub struct NoiseBed {
    pub kind: NatureSound,
    pub samples: Vec<f32>,
    /// Slow amplitude modulation applied on playback
    pub swell_hz: Option<f64>,
}

fn bed_len(sample_rate: u32) -> usize {
    (f64::from(sample_rate) * NOISE_BED_SECONDS) as usize
}

/// Brown noise through a 500 Hz high-pass
pub fn rain_bed<R: Rng + ?Sized>(rng: &mut R, sample_rate: u32) -> NoiseBed {
    let brown = brown_noise(&white_noise(rng, bed_len(sample_rate)));
    NoiseBed {
        kind: NatureSound::Rain,
        samples: filter_chain(&brown, &[FilterSpec::high_pass(500.0)], sample_rate),
        swell_hz: None,
    }
}

/// Quiet white noise through an 800 Hz low-pass, swelling at 0.1 Hz
pub fn ocean_bed<R: Rng + ?Sized>(rng: &mut R, sample_rate: u32) -> NoiseBed {
    let white: Vec<f32> = white_noise(rng, bed_len(sample_rate))
        .into_iter()
        .map(|w| w * 0.3)
        .collect();
    NoiseBed {
        kind: NatureSound::Ocean,
        samples: filter_chain(&white, &[FilterSpec::low_pass(800.0)], sample_rate),
        swell_hz: Some(OCEAN_SWELL_HZ),
    }
}

/// White noise through a wide 1 kHz band-pass, then a 2 kHz high-pass
pub fn forest_bed<R: Rng + ?Sized>(rng: &mut R, sample_rate: u32) -> NoiseBed {
    let white = white_noise(rng, bed_len(sample_rate));
    NoiseBed {
        kind: NatureSound::Forest,
        samples: filter_chain(
            &white,
            &[FilterSpec::band_pass(1000.0, 0.5), FilterSpec::high_pass(2000.0)],
            sample_rate,
        ),
        swell_hz: None,
    }
}

pub fn nature_bed<R: Rng + ?Sized>(kind: NatureSound, rng: &mut R, sample_rate: u32) -> NoiseBed {
    match kind {
        NatureSound::Rain => rain_bed(rng, sample_rate),
        NatureSound::Ocean => ocean_bed(rng, sample_rate),
        NatureSound::Forest => forest_bed(rng, sample_rate),
    }
}

//! Sample buffers and precomputed tone synthesis.

use std::sync::Arc;

/// Peak amplitude of a synthesized tone
pub const TONE_AMPLITUDE: f32 = 0.3;

/// Immutable multi-channel sample data, cheap to clone
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Arc<[f32]>>,
}

impl AudioBuffer {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![Arc::from(samples)],
        }
    }

    /// Stereo buffer whose two channels carry the same samples
    pub fn stereo_from_mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        let shared: Arc<[f32]> = Arc::from(samples);
        Self {
            sample_rate,
            channels: vec![Arc::clone(&shared), shared],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| &c[..])
    }

    /// Frames in the buffer (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Left/right sample at `frame`; mono buffers feed both sides
    pub fn frame(&self, frame: usize) -> [f32; 2] {
        let left = self
            .channels
            .first()
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0);
        let right = self
            .channels
            .get(1)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(left);
        [left, right]
    }
}

/// Linear fade-in/fade-out envelope at time `t` of a `duration`-long tone
pub fn fade_envelope(t: f64, duration: f64, fade: f64) -> f64 {
    if fade <= 0.0 {
        return 1.0;
    }
    if t < fade {
        t / fade
    } else if t > duration - fade {
        ((duration - t) / fade).max(0.0)
    } else {
        1.0
    }
}

/// Sine samples with the fade envelope baked in
pub fn tone_samples(frequency: f32, seconds: f32, fade_seconds: f32, sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let duration = f64::from(seconds);
    let fade = f64::from(fade_seconds);
    let count = (rate * duration) as usize;
    let omega = 2.0 * std::f64::consts::PI * f64::from(frequency);

    (0..count)
        .map(|i| {
            let t = i as f64 / rate;
            let envelope = fade_envelope(t, duration, fade);
            ((omega * t).sin() * envelope * f64::from(TONE_AMPLITUDE)) as f32
        })
        .collect()
}

/// Stereo tone buffer for one frequency
pub fn tone_buffer(
    frequency: f32,
    seconds: f32,
    fade_seconds: f32,
    sample_rate: u32,
) -> AudioBuffer {
    AudioBuffer::stereo_from_mono(
        sample_rate,
        tone_samples(frequency, seconds, fade_seconds, sample_rate),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length_and_channels() {
        let buffer = tone_buffer(528.0, 3.0, 1.0, 8000);
        assert_eq!(buffer.frames(), 24_000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.channel(0), buffer.channel(1));
        assert!((buffer.duration_seconds() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fades_are_baked_in() {
        let samples = tone_samples(250.0, 4.0, 1.0, 1000);
        assert_eq!(samples[0], 0.0);

        let peak = |range: std::ops::Range<usize>| {
            samples[range].iter().fold(0.0_f32, |m, s| m.max(s.abs()))
        };
        // Quiet near the edges, full amplitude in the middle
        assert!(peak(0..100) < 0.031);
        assert!(peak(3900..4000) < 0.031);
        assert!((peak(1900..2100) - TONE_AMPLITUDE).abs() < 0.01);
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(fade_envelope(0.0, 30.0, 2.0), 0.0);
        assert_eq!(fade_envelope(1.0, 30.0, 2.0), 0.5);
        assert_eq!(fade_envelope(15.0, 30.0, 2.0), 1.0);
        assert_eq!(fade_envelope(29.0, 30.0, 2.0), 0.5);
        assert_eq!(fade_envelope(30.0, 30.0, 2.0), 0.0);
        assert_eq!(fade_envelope(5.0, 30.0, 0.0), 1.0);
    }

    #[test]
    fn test_mono_frame_feeds_both_sides() {
        let buffer = AudioBuffer::mono(10, vec![0.5, -0.25]);
        assert_eq!(buffer.frame(1), [-0.25, -0.25]);
        assert_eq!(buffer.frame(5), [0.0, 0.0]);
    }
}

//! Small DSP building blocks: biquad filters and automatable gain.

use std::f64::consts::PI;

/// Floor for exponential ramps, which cannot reach zero
pub const MIN_EXPONENTIAL_GAIN: f32 = 0.001;

/// Default quality factor (Butterworth)
pub const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

/// Declarative filter description, turned into a [`Biquad`] at a sample rate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff_hz: f32,
    pub q: f32,
}

impl FilterSpec {
    pub fn low_pass(cutoff_hz: f32) -> Self {
        Self {
            kind: FilterKind::LowPass,
            cutoff_hz,
            q: DEFAULT_Q,
        }
    }

    pub fn high_pass(cutoff_hz: f32) -> Self {
        Self {
            kind: FilterKind::HighPass,
            cutoff_hz,
            q: DEFAULT_Q,
        }
    }

    pub fn band_pass(center_hz: f32, q: f32) -> Self {
        Self {
            kind: FilterKind::BandPass,
            cutoff_hz: center_hz,
            q,
        }
    }
}

/// Second-order IIR section (RBJ cookbook coefficients, transposed DF-II)
#[derive(Clone, Debug)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(spec: FilterSpec, sample_rate: u32) -> Self {
        let rate = f64::from(sample_rate.max(1));
        // Keep the corner below Nyquist so low test sample rates stay stable
        let cutoff = f64::from(spec.cutoff_hz).clamp(1.0, rate * 0.45);
        let q = f64::from(spec.q).max(0.01);

        let w0 = 2.0 * PI * cutoff / rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2) = match spec.kind {
            FilterKind::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterKind::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = f64::from(input);
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Run `samples` through a chain of filters, offline
pub fn filter_chain(samples: &[f32], specs: &[FilterSpec], sample_rate: u32) -> Vec<f32> {
    let mut filters: Vec<Biquad> = specs.iter().map(|s| Biquad::new(*s, sample_rate)).collect();
    samples
        .iter()
        .map(|&x| filters.iter_mut().fold(x, |acc, f| f.process(acc)))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampShape {
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Ramp {
    from: f32,
    to: f32,
    start: f64,
    end: f64,
    shape: RampShape,
}

/// Gain value with optional automation, evaluated on the graph clock (seconds)
#[derive(Clone, Debug, PartialEq)]
pub struct GainParam {
    /// Value once any ramp has settled
    value: f32,
    ramp: Option<Ramp>,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Jump to `value`, dropping any ramp in progress
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    /// Ramp from the value at `now` to `target` over `duration` seconds
    pub fn ramp_to(&mut self, target: f32, now: f64, duration: f64, shape: RampShape) {
        let mut from = self.value_at(now);
        let mut to = target;
        if shape == RampShape::Exponential {
            from = from.max(MIN_EXPONENTIAL_GAIN);
            to = to.max(MIN_EXPONENTIAL_GAIN);
        }

        if !(duration > 0.0) {
            self.set_value(to);
            return;
        }

        self.value = to;
        self.ramp = Some(Ramp {
            from,
            to,
            start: now,
            end: now + duration,
            shape,
        });
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let Some(ramp) = self.ramp else {
            return self.value;
        };
        if t >= ramp.end {
            return ramp.to;
        }
        if t <= ramp.start {
            return ramp.from;
        }

        let progress = (t - ramp.start) / (ramp.end - ramp.start);
        let from = f64::from(ramp.from);
        let to = f64::from(ramp.to);
        let value = match ramp.shape {
            RampShape::Linear => from + (to - from) * progress,
            RampShape::Exponential => from * (to / from).powf(progress),
        };
        value as f32
    }

    /// Value after any ramp settles
    pub fn target(&self) -> f32 {
        self.value
    }

    pub fn is_ramping(&self, t: f64) -> bool {
        self.ramp.is_some_and(|r| t < r.end)
    }
}

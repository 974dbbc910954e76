//! Resonant low-pass filter with smoothed cutoff and Q

use core::f32::consts::PI;

use crate::node::{AudioNode, NodeKind, ProcessContext};
use crate::param::{Ramp, CUTOFF, FILTER_TIME_CONSTANT, RESONANCE};

/// Messages to control the filter
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterMessage {
    /// Ramp the cutoff frequency (Hz) toward a new target. Non-finite
    /// values are ignored, others are clamped to the valid range.
    SetCutoff(f32),
    /// Ramp the resonance (Q) toward a new target
    SetResonance(f32),
}

#[derive(Clone, Copy, Debug, Default)]
struct Coeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coeffs {
    /// RBJ cookbook low-pass
    fn lowpass(cutoff: f32, q: f32, sample_rate: f32) -> Self {
        // keep the pole pair below Nyquist at low sample rates
        let cutoff = cutoff.min(sample_rate * 0.49);
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w0) / a0;
        Self {
            b0: b1 * 0.5,
            b1,
            b2: b1 * 0.5,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Transposed direct form II state for one channel
#[derive(Clone, Copy, Debug, Default)]
struct Channel {
    z1: f32,
    z2: f32,
}

impl Channel {
    #[inline]
    fn process(&mut self, x: f32, c: &Coeffs) -> f32 {
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }
}

/// A stereo biquad low-pass.
///
/// Cutoff and Q changes glide exponentially (time constant 10 ms), with the
/// coefficients recomputed every sample while either parameter is moving.
pub struct Filter {
    cutoff: Ramp,
    resonance: Ramp,
    coeffs: Coeffs,
    left: Channel,
    right: Channel,
    sample_rate: u32,
}

impl Filter {
    pub fn new(cutoff: f32, resonance: f32, sample_rate: u32) -> Self {
        let cutoff = cutoff.clamp(CUTOFF.min, CUTOFF.max);
        let resonance = resonance.clamp(RESONANCE.min, RESONANCE.max);
        Self {
            cutoff: Ramp::new(cutoff).with_time_constant(FILTER_TIME_CONSTANT, sample_rate),
            resonance: Ramp::new(resonance).with_time_constant(FILTER_TIME_CONSTANT, sample_rate),
            coeffs: Coeffs::lowpass(cutoff, resonance, sample_rate as f32),
            left: Channel::default(),
            right: Channel::default(),
            sample_rate,
        }
    }

    /// Cutoff in effect for the most recent sample
    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff.current()
    }

    #[inline]
    pub fn target_cutoff(&self) -> f32 {
        self.cutoff.target()
    }

    /// Q in effect for the most recent sample
    #[inline]
    pub fn resonance(&self) -> f32 {
        self.resonance.current()
    }

    #[inline]
    pub fn target_resonance(&self) -> f32 {
        self.resonance.target()
    }

    /// Both parameters have reached their targets
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.cutoff.is_settled() && self.resonance.is_settled()
    }
}

impl AudioNode for Filter {
    type Message = FilterMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = FilterMessage>,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        for msg in messages {
            match msg {
                FilterMessage::SetCutoff(hz) if hz.is_finite() => {
                    self.cutoff.set_target(hz.clamp(CUTOFF.min, CUTOFF.max))
                }
                FilterMessage::SetResonance(q) if q.is_finite() => self
                    .resonance
                    .set_target(q.clamp(RESONANCE.min, RESONANCE.max)),
                _ => {}
            }
        }

        if ctx.sample_rate != self.sample_rate {
            self.sample_rate = ctx.sample_rate;
            self.cutoff.set_time_constant(FILTER_TIME_CONSTANT, ctx.sample_rate);
            self.resonance.set_time_constant(FILTER_TIME_CONSTANT, ctx.sample_rate);
        }
        let sample_rate = self.sample_rate as f32;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if !self.is_settled() {
                let cutoff = self.cutoff.tick();
                let q = self.resonance.tick();
                self.coeffs = Coeffs::lowpass(cutoff, q, sample_rate);
            }
            *l = self.left.process(*l, &self.coeffs);
            *r = self.right.process(*r, &self.coeffs);
        }
    }

    #[inline]
    fn kind(&self) -> NodeKind {
        NodeKind::Filter
    }
}

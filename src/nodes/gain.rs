//! Output level

use crate::node::{AudioNode, NodeKind, ProcessContext};
use crate::param::Ramp;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GainMessage {
    /// New level, 1.0 is unity. Non-finite values are ignored.
    SetGain(f32),
}

/// Scales both channels by one shared level.
///
/// By default a new level takes effect from the first sample of the next
/// quantum. [`with_time_constant`](Self::with_time_constant) makes level
/// changes glide instead.
pub struct Gain {
    level: Ramp,
    time_constant: Option<f32>,
    sample_rate: u32,
}

impl Gain {
    pub fn new(level: f32) -> Self {
        Self {
            level: Ramp::new(level),
            time_constant: None,
            sample_rate: 0,
        }
    }

    /// Glide toward new levels with this time constant in seconds.
    pub fn with_time_constant(mut self, seconds: f32, sample_rate: u32) -> Self {
        self.level.set_time_constant(seconds, sample_rate);
        self.time_constant = Some(seconds);
        self.sample_rate = sample_rate;
        self
    }

    /// Level being approached
    #[inline]
    pub fn gain(&self) -> f32 {
        self.level.target()
    }

    /// Level applied to the most recent sample
    #[inline]
    pub fn current_gain(&self) -> f32 {
        self.level.current()
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = GainMessage>,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        for GainMessage::SetGain(level) in messages {
            if level.is_finite() {
                self.level.set_target(level);
            }
        }

        if let Some(seconds) = self.time_constant {
            if ctx.sample_rate != self.sample_rate {
                self.sample_rate = ctx.sample_rate;
                self.level.set_time_constant(seconds, ctx.sample_rate);
            }
        }

        if self.level.is_settled() || self.time_constant.is_none() {
            let level = self.level.tick();
            left.iter_mut().chain(right.iter_mut()).for_each(|s| *s *= level);
            return;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let level = self.level.tick();
            *l *= level;
            *r *= level;
        }
    }

    #[inline]
    fn kind(&self) -> NodeKind {
        NodeKind::Gain
    }
}

//! A small stereo test tone with a ping-pong echo.

use crate::engine::RenderEngine;
use crate::error::RenderError;

const ECHO_SECONDS: f32 = 0.3;
const ECHO_FEEDBACK: f32 = 0.45;
/// Detune of the right oscillator at full width.
const MAX_DETUNE: f32 = 0.004;

/// Two sine oscillators, one per channel, fed through a ping-pong echo.
///
/// `width` detunes the right oscillator against the left one, `wet` blends
/// in the echo.
pub struct ToneEngine {
    frequency: f32,
    amplitude: f32,
    sample_rate: f32,
    phase_l: f32,
    phase_r: f32,
    wet: f32,
    width: f32,
    echo_l: Vec<f32>,
    echo_r: Vec<f32>,
    echo_pos: usize,
}

impl ToneEngine {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            amplitude: 0.25,
            sample_rate: 0.0,
            phase_l: 0.0,
            phase_r: 0.0,
            wet: 0.0,
            width: 0.0,
            echo_l: Vec::new(),
            echo_r: Vec::new(),
            echo_pos: 0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Current `(wet, width)`.
    #[inline]
    pub fn parameters(&self) -> (f32, f32) {
        (self.wet, self.width)
    }
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new(220.0)
    }
}

impl RenderEngine for ToneEngine {
    fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let len = ((ECHO_SECONDS * sample_rate) as usize).max(1);
        self.echo_l = vec![0.0; len];
        self.echo_r = vec![0.0; len];
        self.echo_pos = 0;
        self.phase_l = 0.0;
        self.phase_r = 0.0;
    }

    fn set_parameters(&mut self, wet: f32, width: f32) {
        self.wet = wet.clamp(0.0, 1.0);
        self.width = width.clamp(0.0, 1.0);
    }

    fn render_block(&mut self, out: &mut [f32]) -> Result<(), RenderError> {
        if self.echo_l.is_empty() || self.sample_rate <= 0.0 {
            return Err(RenderError::NotInitialised);
        }

        let inc_l = self.frequency / self.sample_rate;
        let inc_r = inc_l * (1.0 + self.width * MAX_DETUNE);
        let dry = 1.0 - 0.5 * self.wet;

        for frame in out.chunks_exact_mut(2) {
            let l = (self.phase_l * core::f32::consts::TAU).sin() * self.amplitude;
            let r = (self.phase_r * core::f32::consts::TAU).sin() * self.amplitude;

            self.phase_l += inc_l;
            self.phase_l -= (self.phase_l >= 1.0) as u32 as f32;
            self.phase_r += inc_r;
            self.phase_r -= (self.phase_r >= 1.0) as u32 as f32;

            let echo_l = self.echo_l[self.echo_pos];
            let echo_r = self.echo_r[self.echo_pos];
            // cross-fed: each side's tail returns on the other side
            self.echo_l[self.echo_pos] = l + echo_r * ECHO_FEEDBACK;
            self.echo_r[self.echo_pos] = r + echo_l * ECHO_FEEDBACK;
            self.echo_pos += 1;
            if self.echo_pos == self.echo_l.len() {
                self.echo_pos = 0;
            }

            frame[0] = l * dry + echo_l * self.wet;
            frame[1] = r * dry + echo_r * self.wet;
        }

        Ok(())
    }
}

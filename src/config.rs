//! Session configuration.
//!
//! Built in code with the `with_*` builder methods, or loaded from YAML where
//! every field is optional:
//!
//! ```
//! use muso::SessionConfig;
//!
//! let config = SessionConfig::from_yaml_str("quantum: 256\nlookahead: 4\n").unwrap();
//! assert_eq!(config.quantum, 256);
//! assert_eq!(config.fft_size, 2048);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::param::{CUTOFF, RESONANCE, VOLUME, WET, WIDTH};

/// Largest pull the bridge will honour, in frames.
pub const MAX_PULL_FRAMES: usize = 8192;

/// Everything needed to assemble one streaming session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Sample rate used when no device dictates one (headless sessions).
    pub sample_rate: u32,
    /// Frames per real-time callback quantum.
    pub quantum: usize,
    /// Rendered blocks queued ahead of the callback.
    pub lookahead: usize,
    /// How often the bridge thread checks for pulls.
    pub poll_interval_ms: u64,
    /// Consecutive engine failures tolerated before the bridge gives up.
    pub max_render_failures: u32,
    /// Insert the low-pass filter between tap and gain.
    pub filter: bool,
    pub fft_size: usize,
    /// Spectrum averaging between snapshots, 0 disables it.
    pub smoothing: f32,
    /// Capacity of every control message queue.
    pub message_queue: usize,
    pub params: InitialParams,
}

/// Parameter values applied when a session starts.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialParams {
    pub wet: f32,
    pub width: f32,
    pub cutoff: f32,
    pub resonance: f32,
    pub volume: f32,
}

impl Default for InitialParams {
    fn default() -> Self {
        Self {
            wet: WET.default,
            width: WIDTH.default,
            cutoff: CUTOFF.default,
            resonance: RESONANCE.default,
            volume: VOLUME.default,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            quantum: 128,
            lookahead: 3,
            poll_interval_ms: 1,
            max_render_failures: 8,
            filter: true,
            fft_size: 2048,
            smoothing: 0.8,
            message_queue: 64,
            params: InitialParams::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_quantum(mut self, quantum: usize) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_max_render_failures(mut self, failures: u32) -> Self {
        self.max_render_failures = failures;
        self
    }

    /// Build the chain without the low-pass filter (tap feeds gain directly).
    pub fn without_filter(mut self) -> Self {
        self.filter = false;
        self
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_params(mut self, params: InitialParams) -> Self {
        self.params = params;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check(
            "sample_rate",
            self.sample_rate,
            (8_000..=384_000).contains(&self.sample_rate),
            "8000..=384000",
        )?;
        check(
            "quantum",
            self.quantum,
            (16..=4096).contains(&self.quantum),
            "16..=4096",
        )?;
        check(
            "lookahead",
            self.lookahead,
            (1..=8).contains(&self.lookahead),
            "1..=8",
        )?;
        check(
            "poll_interval_ms",
            self.poll_interval_ms,
            (1..=100).contains(&self.poll_interval_ms),
            "1..=100",
        )?;
        check(
            "max_render_failures",
            self.max_render_failures,
            self.max_render_failures >= 1,
            ">= 1",
        )?;
        check(
            "fft_size",
            self.fft_size,
            self.fft_size.is_power_of_two() && (32..=32_768).contains(&self.fft_size),
            "power of two in 32..=32768",
        )?;
        check(
            "smoothing",
            self.smoothing,
            self.smoothing.is_finite() && (0.0..1.0).contains(&self.smoothing),
            "0.0..1.0",
        )?;
        check(
            "message_queue",
            self.message_queue,
            self.message_queue >= 4,
            ">= 4",
        )?;

        let p = &self.params;
        for (spec, value) in [
            (&WET, p.wet),
            (&WIDTH, p.width),
            (&CUTOFF, p.cutoff),
            (&RESONANCE, p.resonance),
            (&VOLUME, p.volume),
        ] {
            check(spec.name, value, spec.accepts(value), spec.range_label)?;
        }

        Ok(())
    }
}

fn check<T: ToString>(
    field: &'static str,
    value: T,
    ok: bool,
    expected: &'static str,
) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            value: value.to_string(),
            expected,
        })
    }
}

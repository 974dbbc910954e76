//! Frequency-domain snapshots of the tapped signal.
//!
//! The [`Tap`] node pushes a mono downmix from the audio callback; the
//! [`SpectrumAnalyser`] lives wherever the display runs and turns the most
//! recent `fft_size` samples into magnitudes on demand. Nothing is computed
//! unless somebody asks for a snapshot.

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use rtrb::{Consumer, RingBuffer};

use crate::error::{Error, Result};
use crate::nodes::Tap;

/// Floor of the byte/decibel scale.
pub const MIN_DECIBELS: f32 = -100.0;
/// Ceiling of the byte/decibel scale.
pub const MAX_DECIBELS: f32 = -30.0;

/// Create a connected tap node and analyser.
pub fn tap(fft_size: usize, smoothing: f32, sample_rate: u32) -> Result<(Tap, SpectrumAnalyser)> {
    if !fft_size.is_power_of_two() || !(32..=32_768).contains(&fft_size) {
        return Err(Error::InvalidConfig {
            field: "fft_size",
            value: fft_size.to_string(),
            expected: "power of two in 32..=32768",
        });
    }
    if !smoothing.is_finite() || !(0.0..1.0).contains(&smoothing) {
        return Err(Error::InvalidConfig {
            field: "smoothing",
            value: smoothing.to_string(),
            expected: "0.0..1.0",
        });
    }

    // room for two windows so a display polling at frame rate never misses
    let (producer, consumer) = RingBuffer::new(fft_size * 2);
    Ok((
        Tap::new(producer),
        SpectrumAnalyser::new(consumer, fft_size, smoothing, sample_rate),
    ))
}

/// Reads the tap and produces magnitude spectra.
pub struct SpectrumAnalyser {
    consumer: Consumer<f32>,
    fft_size: usize,
    smoothing: f32,
    sample_rate: u32,
    history: Vec<f32>,
    write_pos: usize,
    received: u64,
    window: Vec<f32>,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyser {
    fn new(consumer: Consumer<f32>, fft_size: usize, smoothing: f32, sample_rate: u32) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Self {
            consumer,
            fft_size,
            smoothing,
            sample_rate,
            history: vec![0.0; fft_size],
            write_pos: 0,
            received: 0,
            window: blackman(fft_size),
            plan,
            input,
            spectrum,
            scratch,
            magnitudes: vec![0.0; fft_size / 2],
        }
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Length of every snapshot: half the transform size.
    #[inline]
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Centre frequency of bin `index` in Hz.
    #[inline]
    pub fn bin_frequency(&self, index: usize) -> f32 {
        index as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Samples received from the tap so far.
    #[inline]
    pub fn samples_received(&self) -> u64 {
        self.received
    }

    /// Linear magnitudes of the latest `fft_size` samples, averaged with the
    /// previous snapshot according to the smoothing factor.
    pub fn snapshot(&mut self) -> Result<&[f32]> {
        self.drain();

        let n = self.fft_size;
        for (i, (slot, w)) in self.input.iter_mut().zip(&self.window).enumerate() {
            *slot = self.history[(self.write_pos + i) % n] * w;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let scale = 1.0 / n as f32;
        let k = self.smoothing;
        for (mag, bin) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *mag = k * *mag + (1.0 - k) * bin.norm() * scale;
        }

        Ok(&self.magnitudes)
    }

    /// Snapshot in decibels. Silent bins read as negative infinity.
    pub fn float_frequency_data(&mut self, out: &mut [f32]) -> Result<()> {
        let mags = self.snapshot()?;
        for (o, &m) in out.iter_mut().zip(mags) {
            *o = to_decibels(m);
        }
        Ok(())
    }

    /// Snapshot mapped linearly from
    /// [`MIN_DECIBELS`]..[`MAX_DECIBELS`] onto `0..=255`.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) -> Result<()> {
        let mags = self.snapshot()?;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (o, &m) in out.iter_mut().zip(mags) {
            let db = to_decibels(m);
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *o = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }
        Ok(())
    }

    /// The most recent samples in arrival order, oldest first.
    pub fn time_domain_data(&mut self, out: &mut [f32]) {
        self.drain();
        let n = self.fft_size;
        for (i, o) in out.iter_mut().take(n).enumerate() {
            *o = self.history[(self.write_pos + i) % n];
        }
    }

    fn drain(&mut self) {
        let available = self.consumer.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = self.consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            for &sample in first.iter().chain(second) {
                self.history[self.write_pos] = sample;
                self.write_pos = (self.write_pos + 1) % self.fft_size;
            }
            self.received += available as u64;
            chunk.commit_all();
        }
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("sample_rate", &self.sample_rate)
            .field("received", &self.received)
            .finish()
    }
}

#[inline]
fn to_decibels(magnitude: f32) -> f32 {
    20.0 * magnitude.log10()
}

fn blackman(len: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..len)
        .map(|i| {
            let x = i as f32 / len as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

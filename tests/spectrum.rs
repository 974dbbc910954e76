use std::f32::consts::TAU;

use muso::nodes::{Filter, Gain, Tap};
use muso::spectrum::{self, SpectrumAnalyser};
use muso::{Error, SignalChain};

const SAMPLE_RATE: u32 = 48_000;
const QUANTUM: usize = 128;

fn tapped_chain(fft_size: usize, smoothing: f32) -> (SignalChain, SpectrumAnalyser) {
    let (tap, analyser) = spectrum::tap(fft_size, smoothing, SAMPLE_RATE).unwrap();
    let mut chain = SignalChain::new(SAMPLE_RATE, QUANTUM);
    chain.add(tap).unwrap();
    (chain, analyser)
}

/// Run `quanta` quanta of a sine at `hz` through the chain.
fn play_sine(chain: &mut SignalChain, hz: f32, quanta: usize) {
    let mut n = 0;
    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    for _ in 0..quanta {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let s = 0.5 * (TAU * hz * n as f32 / SAMPLE_RATE as f32).sin();
            *l = s;
            *r = s;
            n += 1;
        }
        chain.process(&mut left, &mut right);
    }
}

fn peak_bin(magnitudes: &[f32]) -> usize {
    magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap()
}

#[test]
fn snapshot_has_half_the_transform_size() {
    let (_chain, mut analyser) = tapped_chain(2048, 0.8);
    assert_eq!(analyser.fft_size(), 2048);
    assert_eq!(analyser.frequency_bin_count(), 1024);
    assert_eq!(analyser.snapshot().unwrap().len(), 1024);
}

#[test]
/// A sine centred on bin 64 peaks in bin 64
fn sine_peaks_in_its_bin() {
    let (mut chain, mut analyser) = tapped_chain(1024, 0.0);
    let hz = analyser.bin_frequency(64);
    assert_eq!(hz, 3_000.0);

    play_sine(&mut chain, hz, 8);
    let magnitudes = analyser.snapshot().unwrap();
    assert_eq!(peak_bin(magnitudes), 64);
    assert!(magnitudes[64] > 10.0 * magnitudes[200]);
    assert_eq!(analyser.samples_received(), 1024);
}

#[test]
fn silence_reads_as_zero_bytes() {
    let (mut chain, mut analyser) = tapped_chain(256, 0.0);
    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    chain.process(&mut left, &mut right);
    chain.process(&mut left, &mut right);

    let mut bytes = vec![7u8; 128];
    analyser.byte_frequency_data(&mut bytes).unwrap();
    assert!(bytes.iter().all(|&b| b == 0));

    let mut db = vec![0.0; 128];
    analyser.float_frequency_data(&mut db).unwrap();
    assert!(db.iter().all(|&d| d == f32::NEG_INFINITY));
}

#[test]
fn loud_sine_fills_the_byte_scale() {
    let (mut chain, mut analyser) = tapped_chain(1024, 0.0);
    play_sine(&mut chain, analyser.bin_frequency(32), 8);

    let mut bytes = vec![0u8; 512];
    analyser.byte_frequency_data(&mut bytes).unwrap();
    // well above the -30 dB ceiling
    assert_eq!(bytes[32], 255);
    assert!(bytes[200] < 255);
}

#[test]
fn smoothing_averages_successive_snapshots() {
    let (mut chain, mut analyser) = tapped_chain(1024, 0.5);
    play_sine(&mut chain, analyser.bin_frequency(16), 8);

    let first = analyser.snapshot().unwrap()[16];
    let second = analyser.snapshot().unwrap()[16];
    // same input twice: half the gap to the raw magnitude closes each time
    assert!((second - 1.5 * first).abs() < 1e-3 * first);
}

#[test]
fn tap_leaves_the_signal_unchanged() {
    let (mut chain, _analyser) = tapped_chain(2048, 0.8);
    let mut left: Vec<f32> = (0..QUANTUM).map(|i| (i as f32 * 0.1).sin()).collect();
    let mut right: Vec<f32> = (0..QUANTUM).map(|i| (i as f32 * 0.3).cos()).collect();
    let (l0, r0) = (left.clone(), right.clone());

    chain.process(&mut left, &mut right);
    assert_eq!(left, l0);
    assert_eq!(right, r0);
}

#[test]
fn time_domain_is_mono_and_oldest_first() {
    let (mut chain, mut analyser) = tapped_chain(64, 0.0);
    let mut left: Vec<f32> = (0..QUANTUM).map(|i| i as f32).collect();
    let mut right: Vec<f32> = (0..QUANTUM).map(|i| -(i as f32) + 2.0).collect();
    chain.process(&mut left, &mut right);

    let mut out = vec![0.0; 64];
    analyser.time_domain_data(&mut out);
    // (l + r) / 2 == 1.0 for every frame
    assert!(out.iter().all(|&s| s == 1.0));
}

#[test]
fn slow_reader_makes_the_tap_skip() {
    // ring holds two 32-sample windows, less than one quantum
    let (mut chain, mut analyser) = tapped_chain(32, 0.0);
    let mut left = vec![0.25; QUANTUM];
    let mut right = vec![0.25; QUANTUM];
    chain.process(&mut left, &mut right);

    assert_eq!(chain.tap().unwrap().skipped(), QUANTUM as u64);
    assert_eq!(analyser.samples_received(), 0);
    assert_eq!(left, vec![0.25; QUANTUM]);
}

#[test]
fn invalid_analyser_settings_are_rejected() {
    assert!(matches!(
        spectrum::tap(1000, 0.8, SAMPLE_RATE),
        Err(Error::InvalidConfig { field: "fft_size", .. })
    ));
    assert!(matches!(
        spectrum::tap(16, 0.8, SAMPLE_RATE),
        Err(Error::InvalidConfig { field: "fft_size", .. })
    ));
    assert!(matches!(
        spectrum::tap(2048, 1.0, SAMPLE_RATE),
        Err(Error::InvalidConfig { field: "smoothing", .. })
    ));
}

#[test]
fn chain_must_start_with_the_tap() {
    let mut chain = SignalChain::new(SAMPLE_RATE, QUANTUM);
    assert!(matches!(chain.add(Gain::new(1.0)), Err(Error::ChainOrder(_))));
    assert!(chain.is_empty());

    let (tap, _analyser) = spectrum::tap(256, 0.8, SAMPLE_RATE).unwrap();
    chain.add(tap).unwrap();
    chain.add(Gain::new(1.0)).unwrap();

    let (second, _other) = spectrum::tap(256, 0.8, SAMPLE_RATE).unwrap();
    assert!(matches!(chain.add::<Tap>(second), Err(Error::ChainOrder(_))));
    assert_eq!(chain.len(), 2);
}

#[test]
/// Filter and gain come once each, filter first
fn filter_cannot_follow_gain() {
    let (mut chain, _analyser) = tapped_chain(256, 0.8);
    chain.add(Gain::new(1.0)).unwrap();

    let late = chain.add(Filter::new(1_000.0, 0.7, SAMPLE_RATE));
    assert!(matches!(late, Err(Error::ChainOrder(_))));
    assert!(matches!(chain.add(Gain::new(0.5)), Err(Error::ChainOrder(_))));
    assert_eq!(chain.len(), 2);
}

#[test]
/// The analyser sees the full-band signal even when the filter removes it
fn tap_reads_ahead_of_the_filter() {
    let (mut chain, mut analyser) = tapped_chain(1024, 0.0);
    chain.add(Filter::new(100.0, 0.7071, SAMPLE_RATE)).unwrap();
    chain.add(Gain::new(1.0)).unwrap();

    // 9 kHz sits on bin 192 at 1024 points, 48 kHz
    let hz = analyser.bin_frequency(192);
    assert_eq!(hz, 9_000.0);

    let mut n = 0;
    let mut output_peak = 0.0f32;
    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    for quantum in 0..8 {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let s = 0.5 * (TAU * hz * n as f32 / SAMPLE_RATE as f32).sin();
            *l = s;
            *r = s;
            n += 1;
        }
        chain.process(&mut left, &mut right);
        // past the filter's start-up transient
        if quantum >= 4 {
            output_peak = left.iter().chain(&right).fold(output_peak, |p, s| p.max(s.abs()));
        }
    }

    assert!(output_peak < 1e-3, "filtered output peak {output_peak}");
    let magnitudes = analyser.snapshot().unwrap();
    assert_eq!(peak_bin(magnitudes), 192);
    assert!(magnitudes[192] > 0.05);
}

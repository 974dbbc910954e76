//! Plays a test tone through the default output, sweeping the filter and
//! printing a coarse spectrum.
//!
//! Run with: cargo run --example ambient --features cpal_sink [-- config.yaml]

use std::thread::sleep;
use std::time::{Duration, Instant};

use muso::{Session, SessionConfig, ToneEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_yaml_file(path)?,
        None => SessionConfig::default(),
    };

    let mut session = Session::start(&config, ToneEngine::new(110.0))?;
    println!(
        "Playing on {} at {} Hz... sweeping for 10 seconds",
        session.device_name(),
        session.sample_rate()
    );

    let start = Instant::now();
    let mut bytes = vec![0u8; config.fft_size / 2];

    while start.elapsed() < Duration::from_secs(10) {
        let t = start.elapsed().as_secs_f32();

        // slow sweep between 200 Hz and 8 kHz
        let sweep = 0.5 - 0.5 * (t * 0.6).cos();
        let controller = session.controller();
        controller.set_cutoff(200.0 * 40f32.powf(sweep));
        controller.set_width(0.5 + 0.5 * (t * 0.25).sin());

        controller.spectrum().byte_frequency_data(&mut bytes)?;
        let bars: String = bytes
            .chunks(bytes.len() / 32)
            .take(32)
            .map(|c| {
                let level = c.iter().copied().max().unwrap_or(0);
                [' ', '.', ':', '|', '#'][(level as usize * 5 / 256).min(4)]
            })
            .collect();
        print!("\r[{bars}]");

        if session.stats().check_underrun() {
            print!(" underrun");
        }
        if !session.is_rendering() {
            eprintln!("\nrender thread stopped");
            break;
        }

        sleep(Duration::from_millis(33));
    }
    println!();

    let stats = session.stats().snapshot();
    session.stop()?;
    println!(
        "{} quanta, {} underruns, {} discarded",
        stats.quanta, stats.underruns, stats.discarded
    );

    Ok(())
}

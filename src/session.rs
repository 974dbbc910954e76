//! Session assembly and lifecycle.
//!
//! Every session is built from scratch: new queues, new nodes, and whatever
//! engine instance the caller hands in. [`assemble`] produces the pieces
//! without touching any audio device, which is what tests and custom hosts
//! use. With the `cpal_sink` feature, [`Session`] wires them to the default
//! output device.

use rtrb::RingBuffer;
use tracing::debug;

use crate::bridge::BufferBridge;
use crate::config::SessionConfig;
use crate::consumer::CallbackConsumer;
use crate::controller::GraphController;
use crate::driver::QuantumDriver;
use crate::engine::RenderEngine;
use crate::error::Result;
use crate::graph::SignalChain;
use crate::nodes::{Filter, Gain};
use crate::protocol::block_channel;
use crate::spectrum;

/// The three independently owned halves of a session.
///
/// `driver` belongs in the audio callback, `bridge` on a render thread (or
/// polled by hand), and `controller` with whoever adjusts parameters.
pub struct SessionParts<E: RenderEngine> {
    pub driver: QuantumDriver,
    pub bridge: BufferBridge<E>,
    pub controller: GraphController,
}

impl<E: RenderEngine> SessionParts<E> {
    /// Configure the engine and fill the look-ahead queue, so the first
    /// callback already has audio.
    pub fn prime(&mut self) -> Result<()> {
        self.bridge.configure()?;
        let sent = self.bridge.poll()?;
        debug!(blocks = sent, "look-ahead primed");
        Ok(())
    }
}

/// Build the chain Tap -> [Filter] -> Gain and connect it to a fresh bridge.
///
/// `sample_rate` is the rate the output actually runs at and overrides
/// `config.sample_rate`.
pub fn assemble<E: RenderEngine>(
    config: &SessionConfig,
    sample_rate: u32,
    engine: E,
) -> Result<SessionParts<E>> {
    let config = config.clone().with_sample_rate(sample_rate);
    config.validate()?;
    let initial = config.params;

    let (callback_end, render_end) = block_channel(config.lookahead, config.message_queue);
    let consumer = CallbackConsumer::new(callback_end, config.quantum);

    let (tap, analyser) = spectrum::tap(config.fft_size, config.smoothing, sample_rate)?;

    let mut chain = SignalChain::new(sample_rate, config.quantum).with_queue_size(config.message_queue);
    chain.add(tap)?;
    let filter = if config.filter {
        Some(chain.add(Filter::new(initial.cutoff, initial.resonance, sample_rate))?)
    } else {
        None
    };
    let gain = chain.add(Gain::new(initial.volume))?;

    let (params_tx, params_rx) = RingBuffer::new(config.message_queue);
    let bridge = BufferBridge::new(engine, render_end, params_rx, sample_rate as f32, &config);
    let controller = GraphController::new(initial, filter, gain, params_tx, analyser);

    debug!(
        sample_rate,
        quantum = config.quantum,
        lookahead = config.lookahead,
        filter = config.filter,
        "session assembled"
    );

    Ok(SessionParts {
        driver: QuantumDriver::new(consumer, chain),
        bridge,
        controller,
    })
}

#[cfg(feature = "cpal_sink")]
pub use self::output::Session;

#[cfg(feature = "cpal_sink")]
mod output {
    use cpal::traits::StreamTrait;
    use tracing::{info, warn};

    use super::{assemble, SessionParts};
    use crate::bridge::BridgeThread;
    use crate::config::SessionConfig;
    use crate::consumer::ConsumerStats;
    use crate::controller::GraphController;
    use crate::device::OutputDevice;
    use crate::engine::RenderEngine;
    use crate::error::Result;

    /// A session playing through a cpal output device.
    pub struct Session<E: RenderEngine> {
        stream: cpal::Stream,
        bridge: BridgeThread<E>,
        controller: GraphController,
        stats: ConsumerStats,
        device: String,
        sample_rate: u32,
    }

    impl<E: RenderEngine> Session<E> {
        /// Start on the default output device.
        pub fn start(config: &SessionConfig, engine: E) -> Result<Self> {
            let device = OutputDevice::default_output()?;
            Self::start_on(&device, config, engine)
        }

        pub fn start_on(device: &OutputDevice, config: &SessionConfig, engine: E) -> Result<Self> {
            let sample_rate = device.sample_rate();
            let SessionParts {
                driver,
                bridge,
                controller,
            } = {
                let mut parts = assemble(config, sample_rate, engine)?;
                parts.prime()?;
                parts
            };
            let stats = driver.stats();
            let bridge = bridge.spawn(config.poll_interval())?;

            let stream = match device.build_stream(driver).and_then(|stream| {
                stream.play()?;
                Ok(stream)
            }) {
                Ok(stream) => stream,
                Err(err) => {
                    if let Err(bridge_err) = bridge.stop() {
                        warn!(%bridge_err, "bridge failed while the stream was being built");
                    }
                    return Err(err);
                }
            };

            info!(
                device = device.name(),
                sample_rate,
                quantum = config.quantum,
                "session started"
            );

            Ok(Self {
                stream,
                bridge,
                controller,
                stats,
                device: device.name().to_owned(),
                sample_rate,
            })
        }

        pub fn controller(&mut self) -> &mut GraphController {
            &mut self.controller
        }

        pub fn stats(&self) -> &ConsumerStats {
            &self.stats
        }

        pub fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        pub fn device_name(&self) -> &str {
            &self.device
        }

        /// False once the render thread has stopped on its own, e.g. after
        /// repeated engine failures. The stream keeps playing silence.
        pub fn is_rendering(&self) -> bool {
            self.bridge.is_running()
        }

        /// Stop the stream, then the render thread. Returns the engine.
        pub fn stop(self) -> Result<E> {
            let Self {
                stream,
                bridge,
                stats,
                device,
                ..
            } = self;

            if let Err(err) = stream.pause() {
                warn!(%err, "failed to pause output stream");
            }
            drop(stream);

            let bridge = bridge.stop()?;
            info!(
                device = %device,
                report = ?bridge.report(),
                stats = ?stats.snapshot(),
                "session stopped"
            );
            Ok(bridge.into_engine())
        }
    }
}

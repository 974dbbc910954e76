//! The render side of the block exchange.
//!
//! [`BufferBridge`] owns the [`RenderEngine`] and answers the callback's pulls
//! with freshly rendered [`AudioBlock`]s. It runs on an ordinary thread: it
//! may allocate and may be late, in which case the callback plays silence.
//!
//! Failure policy:
//! - an engine `Err` drops that block; after `max_render_failures` in a row
//!   the bridge stops with [`BridgeError::EngineFailed`]
//! - an engine panic stops the bridge with [`BridgeError::EnginePanicked`]
//! - non-finite samples are replaced with silence before delivery

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rtrb::Consumer;
use tracing::{debug, error, info, trace, warn};

use crate::config::{SessionConfig, MAX_PULL_FRAMES};
use crate::engine::RenderEngine;
use crate::error::BridgeError;
use crate::protocol::{AudioBlock, BridgeMessage, ConsumerMessage, EngineParams, RenderEnd};

/// Totals kept by the bridge, for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeReport {
    /// Pull requests received.
    pub pulls: u64,
    /// Pulls that arrived while the look-ahead queue was already full.
    pub ignored_pulls: u64,
    /// Pulls asking for zero or too many frames.
    pub rejected_pulls: u64,
    /// Blocks handed to the callback.
    pub blocks_sent: u64,
    /// Spent blocks the callback handed back.
    pub blocks_recycled: u64,
    pub render_failures: u64,
    /// Non-finite samples replaced with 0.0.
    pub sanitized_samples: u64,
    /// Engine parameter updates applied (after coalescing).
    pub params_applied: u64,
}

/// Renders blocks on request and hands them to the callback.
pub struct BufferBridge<E: RenderEngine> {
    engine: E,
    end: RenderEnd,
    params: Consumer<EngineParams>,
    sample_rate: f32,
    quantum: usize,
    lookahead: usize,
    max_failures: u32,
    configured: bool,
    /// Messages ever pushed toward the callback, the configure message included.
    pushed: u64,
    /// The configure message may still be sitting unread in the block queue.
    configure_queued: bool,
    consecutive_failures: u32,
    pool: Vec<AudioBlock>,
    pool_limit: usize,
    report: BridgeReport,
}

impl<E: RenderEngine> BufferBridge<E> {
    pub fn new(
        engine: E,
        end: RenderEnd,
        params: Consumer<EngineParams>,
        sample_rate: f32,
        config: &SessionConfig,
    ) -> Self {
        Self {
            engine,
            end,
            params,
            sample_rate,
            quantum: config.quantum,
            lookahead: config.lookahead.max(1),
            max_failures: config.max_render_failures.max(1),
            configured: false,
            pushed: 0,
            configure_queued: false,
            consecutive_failures: 0,
            pool: Vec::new(),
            pool_limit: 2 * config.lookahead + 2,
            report: BridgeReport::default(),
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    #[inline]
    pub fn report(&self) -> BridgeReport {
        self.report
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Initialise the engine and tell the callback the sample rate.
    ///
    /// Must run exactly once, before the first [`poll`](Self::poll).
    pub fn configure(&mut self) -> Result<(), BridgeError> {
        if self.configured {
            return Err(BridgeError::AlreadyConfigured);
        }

        self.engine.init(self.sample_rate);
        self.configured = true;
        info!(
            sample_rate = self.sample_rate,
            quantum = self.quantum,
            lookahead = self.lookahead,
            "render engine configured"
        );

        // the queue has a slot reserved for this message
        match self.end.outbox.push(ConsumerMessage::Configure {
            sample_rate: self.sample_rate,
        }) {
            Ok(()) => {
                self.pushed += 1;
                self.configure_queued = true;
            }
            Err(_) => warn!("configure message did not fit in the block queue"),
        }

        self.apply_params();
        Ok(())
    }

    /// Handle everything the callback sent since the last poll, then top the
    /// look-ahead queue up. Returns how many blocks were delivered.
    pub fn poll(&mut self) -> Result<usize, BridgeError> {
        if !self.configured {
            return Err(BridgeError::NotConfigured);
        }

        self.apply_params();

        let mut sent = 0;
        while let Ok(message) = self.end.inbox.pop() {
            match message {
                BridgeMessage::Recycle(block) => {
                    self.report.blocks_recycled += 1;
                    self.recycle(block);
                }
                BridgeMessage::Pull { frames } => {
                    self.report.pulls += 1;
                    if frames == 0 || frames > MAX_PULL_FRAMES {
                        self.report.rejected_pulls += 1;
                        warn!(
                            "{}",
                            BridgeError::InvalidPull {
                                frames,
                                max: MAX_PULL_FRAMES
                            }
                        );
                        continue;
                    }
                    if self.end.outbox.slots() == 0 {
                        self.report.ignored_pulls += 1;
                        trace!(frames, "look-ahead full, pull ignored");
                        continue;
                    }
                    if self.deliver(frames)? {
                        sent += 1;
                    }
                }
            }
        }

        sent += self.top_up()?;
        Ok(sent)
    }

    /// Move the bridge onto its own thread, polling every `interval` until
    /// stopped or until the callback side goes away.
    pub fn spawn(self, interval: Duration) -> Result<BridgeThread<E>, BridgeError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("muso-bridge".into())
            .spawn(move || self.run(&flag, interval))
            .map_err(BridgeError::Spawn)?;

        Ok(BridgeThread { running, handle })
    }

    fn run(mut self, running: &AtomicBool, interval: Duration) -> Result<Self, BridgeError> {
        debug!(?interval, "bridge thread started");

        while running.load(Ordering::Acquire) {
            if let Err(err) = self.poll() {
                error!(%err, "bridge stopped");
                return Err(err);
            }
            if self.end.inbox.is_abandoned() && self.end.inbox.is_empty() {
                debug!("callback side dropped, bridge exiting");
                break;
            }
            std::thread::park_timeout(interval);
        }

        debug!(report = ?self.report, "bridge thread finished");
        Ok(self)
    }

    /// Render quantum-sized blocks until `lookahead` blocks are queued.
    fn top_up(&mut self) -> Result<usize, BridgeError> {
        let mut sent = 0;
        while self.queued_blocks() < self.lookahead && self.end.outbox.slots() > 0 {
            if !self.deliver(self.quantum)? {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Blocks waiting in the callback's queue, not counting an unread
    /// configure message.
    fn queued_blocks(&mut self) -> usize {
        let queued = self.end.outbox.buffer().capacity() - self.end.outbox.slots();
        // configure goes first, so it is unread only while nothing has been
        // consumed yet
        if self.configure_queued && self.pushed != queued as u64 {
            self.configure_queued = false;
        }
        queued - usize::from(self.configure_queued)
    }

    /// Render one block of `frames` frames and push it to the callback.
    /// `Ok(false)` means the engine failed this time but may recover.
    fn deliver(&mut self, frames: usize) -> Result<bool, BridgeError> {
        let mut block = self.take_block(frames);

        let engine = &mut self.engine;
        let outcome = catch_unwind(AssertUnwindSafe(|| engine.render_block(block.as_mut_slice())));

        match outcome {
            Err(_) => {
                error!(frames, "render engine panicked");
                Err(BridgeError::EnginePanicked)
            }
            Ok(Err(err)) => {
                self.report.render_failures += 1;
                self.consecutive_failures += 1;
                self.recycle(block);
                warn!(
                    %err,
                    failures = self.consecutive_failures,
                    "render failed, callback will play silence"
                );
                if self.consecutive_failures >= self.max_failures {
                    return Err(BridgeError::EngineFailed {
                        failures: self.consecutive_failures,
                        last: err,
                    });
                }
                Ok(false)
            }
            Ok(Ok(())) => {
                self.consecutive_failures = 0;
                self.sanitize(&mut block);
                match self.end.outbox.push(ConsumerMessage::Block(block)) {
                    Ok(()) => {
                        self.pushed += 1;
                        self.report.blocks_sent += 1;
                        Ok(true)
                    }
                    Err(rtrb::PushError::Full(message)) => {
                        if let ConsumerMessage::Block(block) = message {
                            self.recycle(block);
                        }
                        Ok(false)
                    }
                }
            }
        }
    }

    fn sanitize(&mut self, block: &mut AudioBlock) {
        let mut replaced = 0;
        for sample in block.as_mut_slice() {
            if !sample.is_finite() {
                *sample = 0.0;
                replaced += 1;
            }
        }
        if replaced > 0 {
            self.report.sanitized_samples += replaced;
            warn!(replaced, "render engine produced non-finite samples");
        }
    }

    fn take_block(&mut self, frames: usize) -> AudioBlock {
        match self.pool.iter().position(|b| b.holds_frames(frames)) {
            Some(i) => self.pool.swap_remove(i),
            None => AudioBlock::new(frames),
        }
    }

    fn recycle(&mut self, block: AudioBlock) {
        if self.pool.len() < self.pool_limit {
            self.pool.push(block);
        }
    }

    /// Apply the newest pending parameter update, dropping older ones.
    fn apply_params(&mut self) {
        let mut latest = None;
        while let Ok(params) = self.params.pop() {
            latest = Some(params);
        }
        if let Some(EngineParams { wet, width }) = latest {
            self.engine.set_parameters(wet, width);
            self.report.params_applied += 1;
            debug!(wet, width, "engine parameters applied");
        }
    }
}

/// A bridge running on its own thread.
pub struct BridgeThread<E: RenderEngine> {
    running: Arc<AtomicBool>,
    handle: JoinHandle<Result<BufferBridge<E>, BridgeError>>,
}

impl<E: RenderEngine> BridgeThread<E> {
    /// False once the thread has exited, including after an engine failure.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop polling and join. Returns the bridge so its engine and report can
    /// be inspected, or the error that stopped it early.
    pub fn stop(self) -> Result<BufferBridge<E>, BridgeError> {
        self.running.store(false, Ordering::Release);
        self.handle.thread().unpark();
        self.handle.join().map_err(|_| BridgeError::ThreadPanicked)?
    }
}

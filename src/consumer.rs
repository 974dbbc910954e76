//! The real-time side of the block exchange.
//!
//! [`CallbackConsumer::process_quantum`] runs inside the host audio callback.
//! It never allocates, never blocks, and never fails: when no usable block is
//! queued it writes silence and asks the bridge for more.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use itertools::izip;

use crate::protocol::{AudioBlock, BridgeMessage, CallbackEnd, ConsumerMessage};

/// Where the consumer stands after its most recent quantum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    /// Played a block; nothing else queued yet.
    Idle,
    /// Played a block and at least one more is already queued.
    HasBlock,
    /// Played silence and asked for a block.
    Requesting,
}

#[derive(Debug, Default)]
struct Counters {
    quanta: AtomicU64,
    delivered: AtomicU64,
    underruns: AtomicU64,
    discarded: AtomicU64,
    dropped_messages: AtomicU64,
    ignored_configures: AtomicU64,
    had_underrun: AtomicBool,
}

/// Diagnostic counters, readable from any thread while the callback runs.
#[derive(Clone, Debug, Default)]
pub struct ConsumerStats {
    counters: Arc<Counters>,
}

/// A point-in-time copy of [`ConsumerStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Quanta processed, silent or not.
    pub quanta: u64,
    /// Quanta filled from a delivered block.
    pub delivered: u64,
    /// Quanta that fell back to silence.
    pub underruns: u64,
    /// Blocks thrown away because their length was not one quantum.
    pub discarded: u64,
    /// Pulls or recycled blocks that did not fit in the return queue.
    pub dropped_messages: u64,
    /// Rejected or repeated configure messages.
    pub ignored_configures: u64,
}

impl ConsumerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &*self.counters;
        StatsSnapshot {
            quanta: c.quanta.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            underruns: c.underruns.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            dropped_messages: c.dropped_messages.load(Ordering::Relaxed),
            ignored_configures: c.ignored_configures.load(Ordering::Relaxed),
        }
    }

    /// Whether any quantum fell back to silence since the last call
    pub fn check_underrun(&self) -> bool {
        self.counters.had_underrun.swap(false, Ordering::Relaxed)
    }

    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serves one quantum of stereo audio per host callback from blocks rendered
/// elsewhere.
pub struct CallbackConsumer {
    end: CallbackEnd,
    quantum: usize,
    sample_rate: Option<f32>,
    state: ConsumerState,
    stats: ConsumerStats,
}

impl CallbackConsumer {
    /// `quantum` is the fixed number of frames the host asks for per call.
    pub fn new(end: CallbackEnd, quantum: usize) -> Self {
        Self {
            end,
            quantum,
            sample_rate: None,
            state: ConsumerState::Requesting,
            stats: ConsumerStats::default(),
        }
    }

    #[inline]
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Sample rate from the bridge's configure message, once it has arrived.
    #[inline]
    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }

    #[inline]
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// A handle to the counters that stays valid after the consumer moves
    /// into the audio callback.
    pub fn stats(&self) -> ConsumerStats {
        self.stats.clone()
    }

    /// Fill one quantum of output.
    ///
    /// Both slices must be exactly one quantum long; anything else is treated
    /// as a host fault and answered with silence.
    pub fn process_quantum(&mut self, left: &mut [f32], right: &mut [f32]) {
        let c = &*self.stats.counters;
        ConsumerStats::bump(&c.quanta);

        if left.len() != self.quantum || right.len() != self.quantum {
            silence(left);
            silence(right);
            return;
        }

        match self.next_block() {
            Some(block) if block.holds_frames(self.quantum) => {
                deinterleave(block.as_slice(), left, right);
                self.give_back(block);
                self.request();
                ConsumerStats::bump(&self.stats.counters.delivered);
                self.state = if self.end.inbox.is_empty() {
                    ConsumerState::Idle
                } else {
                    ConsumerState::HasBlock
                };
            }
            misfit => {
                if let Some(block) = misfit {
                    ConsumerStats::bump(&self.stats.counters.discarded);
                    self.give_back(block);
                }
                silence(left);
                silence(right);
                self.request();
                ConsumerStats::bump(&self.stats.counters.underruns);
                self.stats.counters.had_underrun.store(true, Ordering::Relaxed);
                self.state = ConsumerState::Requesting;
            }
        }
    }

    /// Pop messages until a block turns up, applying configure on the way.
    fn next_block(&mut self) -> Option<AudioBlock> {
        loop {
            match self.end.inbox.pop().ok()? {
                ConsumerMessage::Configure { sample_rate } => self.configure(sample_rate),
                ConsumerMessage::Block(block) => return Some(block),
            }
        }
    }

    fn configure(&mut self, sample_rate: f32) {
        if self.sample_rate.is_some() || !sample_rate.is_finite() || sample_rate <= 0.0 {
            ConsumerStats::bump(&self.stats.counters.ignored_configures);
            return;
        }
        self.sample_rate = Some(sample_rate);
    }

    fn request(&mut self) {
        // leave room for every block the callback could still hand back, so a
        // stalled bridge fills the return queue with pulls no further than that
        if self.end.outbox.slots() <= self.end.inbox.buffer().capacity() {
            return;
        }
        let pull = BridgeMessage::Pull {
            frames: self.quantum,
        };
        if self.end.outbox.push(pull).is_err() {
            ConsumerStats::bump(&self.stats.counters.dropped_messages);
        }
    }

    fn give_back(&mut self, block: AudioBlock) {
        // A full return queue means the block is freed here. Pulls never eat
        // into the room kept for recycling, so this needs more blocks in
        // flight than the block queue can hold.
        if self.end.outbox.push(BridgeMessage::Recycle(block)).is_err() {
            ConsumerStats::bump(&self.stats.counters.dropped_messages);
        }
    }
}

#[inline]
fn silence(buffer: &mut [f32]) {
    buffer.iter_mut().for_each(|s| *s = 0.0);
}

/// Even samples to `left`, odd samples to `right`.
#[inline]
pub(crate) fn deinterleave(interleaved: &[f32], left: &mut [f32], right: &mut [f32]) {
    for (frame, l, r) in izip!(interleaved.chunks_exact(2), left.iter_mut(), right.iter_mut()) {
        *l = frame[0];
        *r = frame[1];
    }
}

//! Adapts host buffers of any length to the fixed quantum.
//!
//! Hosts rarely call back with exactly one quantum. The driver keeps the
//! remainder of the last processed quantum and hands it out frame by frame,
//! processing a new quantum only when the previous one is used up.

use crate::consumer::{CallbackConsumer, ConsumerStats};
use crate::graph::SignalChain;

/// Runs the consumer and the signal chain one quantum at a time and serves
/// the result at whatever granularity the host wants.
pub struct QuantumDriver {
    consumer: CallbackConsumer,
    chain: SignalChain,
    left: Vec<f32>,
    right: Vec<f32>,
    /// Next unread frame; equal to the quantum when nothing is buffered.
    position: usize,
}

impl QuantumDriver {
    pub fn new(consumer: CallbackConsumer, chain: SignalChain) -> Self {
        let quantum = consumer.quantum().max(1);
        Self {
            consumer,
            chain,
            left: vec![0.0; quantum],
            right: vec![0.0; quantum],
            position: quantum,
        }
    }

    #[inline]
    pub fn quantum(&self) -> usize {
        self.left.len()
    }

    pub fn stats(&self) -> ConsumerStats {
        self.consumer.stats()
    }

    pub fn consumer(&self) -> &CallbackConsumer {
        &self.consumer
    }

    pub fn chain(&self) -> &SignalChain {
        &self.chain
    }

    /// Frames left over from the last quantum.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.left.len() - self.position
    }

    /// Process a full quantum and return both channels. Anything still
    /// buffered from the previous quantum is dropped.
    pub fn process_quantum(&mut self) -> (&[f32], &[f32]) {
        self.advance();
        self.position = self.left.len();
        (&self.left[..], &self.right[..])
    }

    /// Next stereo frame, processing a new quantum when needed.
    #[inline]
    pub fn next_frame(&mut self) -> [f32; 2] {
        if self.position >= self.left.len() {
            self.advance();
        }
        let frame = [self.left[self.position], self.right[self.position]];
        self.position += 1;
        frame
    }

    /// Fill an interleaved host buffer with `channels` channels per frame.
    ///
    /// Mono outputs get the average of both channels; channels beyond the
    /// second are silent.
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.fill_with(out, channels, |s| s);
    }

    /// Like [`fill_interleaved`](Self::fill_interleaved), converting every
    /// sample with `convert`.
    pub fn fill_with<T: Copy>(
        &mut self,
        out: &mut [T],
        channels: usize,
        convert: impl Fn(f32) -> T,
    ) {
        if channels == 0 {
            return;
        }
        let silent = convert(0.0);
        let mut frames = out.chunks_exact_mut(channels);
        for frame in &mut frames {
            let [l, r] = self.next_frame();
            match frame {
                [mono] => *mono = convert(0.5 * (l + r)),
                [left, right, rest @ ..] => {
                    *left = convert(l);
                    *right = convert(r);
                    rest.fill(silent);
                }
                [] => {}
            }
        }
        // a trailing partial frame is not a frame
        frames.into_remainder().fill(silent);
    }

    fn advance(&mut self) {
        self.consumer.process_quantum(&mut self.left, &mut self.right);
        self.chain.process(&mut self.left, &mut self.right);
        self.position = 0;
    }
}

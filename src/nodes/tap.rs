//! Analysis tap: observes the signal without changing it

use rtrb::Producer;

use crate::node::{AudioNode, NodeKind, ProcessContext};

/// Copies a mono downmix of every quantum into a ring buffer read by a
/// [`SpectrumAnalyser`](crate::SpectrumAnalyser). The audio itself passes
/// through untouched.
///
/// If the reader falls behind, samples that don't fit are skipped rather
/// than waited for.
pub struct Tap {
    producer: Producer<f32>,
    skipped: u64,
}

impl Tap {
    pub fn new(producer: Producer<f32>) -> Self {
        Self {
            producer,
            skipped: 0,
        }
    }

    /// Samples not delivered because the reader's ring buffer was full
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl AudioNode for Tap {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        let samples_needed = left.len();

        // Skip the whole quantum rather than write part of it
        if self.producer.slots() < samples_needed {
            self.skipped += samples_needed as u64;
            return;
        }

        for (&l, &r) in left.iter().zip(right.iter()) {
            let _ = self.producer.push(0.5 * (l + r));
        }
    }

    #[inline]
    fn kind(&self) -> NodeKind {
        NodeKind::Tap
    }
}

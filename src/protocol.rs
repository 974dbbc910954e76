//! Messages exchanged between the real-time callback and the render thread.
//!
//! Every message is a typed enum. Buffers travel inside [`AudioBlock`], which
//! is moved through the queues by value: once pushed, the sender has no way
//! to reach the samples again.

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Interleaved stereo samples for a fixed number of frames.
///
/// Not `Clone`: a block has exactly one owner at a time.
#[derive(Debug)]
pub struct AudioBlock {
    samples: Box<[f32]>,
}

impl AudioBlock {
    /// Channels per frame. Always stereo.
    pub const CHANNELS: usize = 2;

    /// A zeroed block holding `frames` stereo frames.
    pub fn new(frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames * Self::CHANNELS].into_boxed_slice(),
        }
    }

    /// Wrap already-interleaved samples. A trailing odd sample is kept, which
    /// makes the block mis-sized for every quantum.
    pub fn from_interleaved(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    /// Whole frames held by this block.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / Self::CHANNELS
    }

    /// Exactly `frames` complete frames and nothing else.
    #[inline]
    pub fn holds_frames(&self, frames: usize) -> bool {
        self.samples.len() == frames * Self::CHANNELS
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.samples.into_vec()
    }
}

/// Callback -> render thread.
#[derive(Debug)]
pub enum BridgeMessage {
    /// Render `frames` frames and send them back.
    Pull { frames: usize },
    /// A spent block handed back for reuse, so the callback never frees.
    Recycle(AudioBlock),
}

/// Render thread -> callback.
#[derive(Debug)]
pub enum ConsumerMessage {
    /// Sent once per session, before any block.
    Configure { sample_rate: f32 },
    Block(AudioBlock),
}

/// Controller -> render thread. Only the latest pending value is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParams {
    pub wet: f32,
    pub width: f32,
}

/// Queue ends held by the callback side.
pub struct CallbackEnd {
    pub(crate) inbox: Consumer<ConsumerMessage>,
    pub(crate) outbox: Producer<BridgeMessage>,
}

impl CallbackEnd {
    /// Queue a message for the render side. Hands it back if the queue is full.
    pub fn send(&mut self, msg: BridgeMessage) -> Result<(), BridgeMessage> {
        self.outbox.push(msg).map_err(|PushError::Full(m)| m)
    }

    /// Next message from the render side, if any.
    pub fn recv(&mut self) -> Option<ConsumerMessage> {
        self.inbox.pop().ok()
    }

    /// Messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.inbox.slots()
    }
}

/// Queue ends held by the render side.
pub struct RenderEnd {
    pub(crate) inbox: Consumer<BridgeMessage>,
    pub(crate) outbox: Producer<ConsumerMessage>,
}

impl RenderEnd {
    /// Queue a message for the callback. Hands it back if the queue is full.
    pub fn send(&mut self, msg: ConsumerMessage) -> Result<(), ConsumerMessage> {
        self.outbox.push(msg).map_err(|PushError::Full(m)| m)
    }

    /// Next message from the callback, if any.
    pub fn recv(&mut self) -> Option<BridgeMessage> {
        self.inbox.pop().ok()
    }

    /// Messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.inbox.slots()
    }

    /// Free slots toward the callback.
    pub fn free_slots(&self) -> usize {
        self.outbox.slots()
    }
}

/// Create the two queues connecting a consumer and a bridge.
///
/// The bridge -> callback queue holds `lookahead` blocks plus one slot for
/// the configure message. The return queue is sized so that every pull
/// and every recycled block the callback can produce between two bridge polls
/// fits without the callback having to drop anything.
pub fn block_channel(lookahead: usize, request_capacity: usize) -> (CallbackEnd, RenderEnd) {
    let lookahead = lookahead.max(1);
    let (to_callback, from_render) = RingBuffer::new(lookahead + 1);
    let (to_render, from_callback) = RingBuffer::new(request_capacity.max(2 * lookahead + 2));

    (
        CallbackEnd {
            inbox: from_render,
            outbox: to_render,
        },
        RenderEnd {
            inbox: from_callback,
            outbox: to_callback,
        },
    )
}

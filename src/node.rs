//! What a chain node is: the trait, its per-quantum context, and the
//! positions a node can take.

/// Fixed facts about the chain, handed to every [`AudioNode::process`] call.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Hz
    pub sample_rate: u32,
    /// Frames per call
    pub quantum: usize,
}

/// Chain positions, in the only order a [`SignalChain`](crate::SignalChain)
/// accepts them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeKind {
    Tap,
    Filter,
    Gain,
}

/// A stage of the [`SignalChain`](crate::SignalChain).
///
/// A node rewrites one stereo quantum in place. Parameter changes reach it
/// only as messages, handed over as an iterator on each call:
///
/// ```
/// use muso::{AudioNode, NodeKind, ProcessContext};
///
/// enum TrimMessage {
///     SetTrim(f32),
/// }
///
/// struct Trim {
///     trim: f32,
/// }
///
/// impl AudioNode for Trim {
///     type Message = TrimMessage;
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         messages: impl Iterator<Item = TrimMessage>,
///         left: &mut [f32],
///         right: &mut [f32],
///     ) {
///         for msg in messages {
///             match msg {
///                 TrimMessage::SetTrim(t) => self.trim = t,
///             }
///         }
///
///         for sample in left.iter_mut().chain(right.iter_mut()) {
///             *sample *= self.trim;
///         }
///     }
///
///     fn kind(&self) -> NodeKind {
///         NodeKind::Gain
///     }
/// }
/// ```
pub trait AudioNode: Send + 'static {
    /// Parameter updates this node understands; `()` if it has none.
    type Message: Send + 'static;

    /// Runs on the audio thread once per quantum, so it must neither allocate
    /// nor block. `messages` holds every update queued since the last call;
    /// apply them before touching the samples.
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        left: &mut [f32],
        right: &mut [f32],
    );

    /// Which chain position this node occupies.
    fn kind(&self) -> NodeKind;
}

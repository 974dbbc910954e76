//! The fixed stereo chain run by the audio callback

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::{Error, Result};
use crate::node::{AudioNode, NodeKind, ProcessContext};
use crate::nodes::{Filter, Gain, Tap};

/// Control-side end of one node's parameter queue.
///
/// Whatever is pushed here is seen by the node at the start of its next
/// quantum.
pub struct NodeHandle<M: Send + 'static> {
    kind: NodeKind,
    sender: Producer<M>,
}

impl<M: Send + 'static> NodeHandle<M> {
    /// Hands the message back when the queue has no room
    pub fn send(&mut self, msg: M) -> core::result::Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

/// A node together with the receiving end of its message queue.
pub struct Slot<N: AudioNode> {
    node: N,
    receiver: Consumer<N::Message>,
}

impl<N: AudioNode> Slot<N> {
    fn process(&mut self, ctx: &ProcessContext, left: &mut [f32], right: &mut [f32]) {
        let Self { node, receiver } = self;
        node.process(ctx, core::iter::from_fn(|| receiver.pop().ok()), left, right);
    }

    pub fn node(&self) -> &N {
        &self.node
    }
}

/// One position in the chain.
pub enum GraphNode {
    Tap(Slot<Tap>),
    Filter(Slot<Filter>),
    Gain(Slot<Gain>),
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Tap(_) => NodeKind::Tap,
            GraphNode::Filter(_) => NodeKind::Filter,
            GraphNode::Gain(_) => NodeKind::Gain,
        }
    }

    fn process(&mut self, ctx: &ProcessContext, left: &mut [f32], right: &mut [f32]) {
        match self {
            GraphNode::Tap(s) => s.process(ctx, left, right),
            GraphNode::Filter(s) => s.process(ctx, left, right),
            GraphNode::Gain(s) => s.process(ctx, left, right),
        }
    }
}

impl From<Slot<Tap>> for GraphNode {
    fn from(slot: Slot<Tap>) -> Self {
        GraphNode::Tap(slot)
    }
}

impl From<Slot<Filter>> for GraphNode {
    fn from(slot: Slot<Filter>) -> Self {
        GraphNode::Filter(slot)
    }
}

impl From<Slot<Gain>> for GraphNode {
    fn from(slot: Slot<Gain>) -> Self {
        GraphNode::Gain(slot)
    }
}

/// A linear stereo processing chain at a fixed sample rate and quantum.
///
/// The tap always comes first, so whatever reads it sees the signal before
/// any filtering or gain.
pub struct SignalChain {
    nodes: Vec<GraphNode>,
    ctx: ProcessContext,
    queue_size: usize,
}

impl SignalChain {
    pub fn new(sample_rate: u32, quantum: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(3),
            ctx: ProcessContext {
                sample_rate,
                quantum,
            },
            queue_size: 64,
        }
    }

    /// Capacity of each node's message queue
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    #[inline]
    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    /// Append a node and get the handle for its queue
    ///
    /// Only Tap, then an optional Filter, then Gain is accepted; anything else
    /// fails with [`Error::ChainOrder`].
    pub fn add<N>(&mut self, node: N) -> Result<NodeHandle<N::Message>>
    where
        N: AudioNode,
        GraphNode: From<Slot<N>>,
    {
        let kind = node.kind();
        match (self.nodes.last().map(GraphNode::kind), kind) {
            (None, NodeKind::Tap)
            | (Some(NodeKind::Tap), NodeKind::Filter)
            | (Some(NodeKind::Tap | NodeKind::Filter), NodeKind::Gain) => {}
            (None, _) => return Err(Error::ChainOrder("the chain must start with the tap")),
            (Some(_), NodeKind::Tap) => {
                return Err(Error::ChainOrder("the tap may only appear once, at the head"))
            }
            (Some(_), _) => {
                return Err(Error::ChainOrder("filter and gain follow the tap once each, in that order"))
            }
        }

        let (producer, consumer) = RingBuffer::new(self.queue_size);
        self.nodes.push(GraphNode::from(Slot {
            node,
            receiver: consumer,
        }));

        Ok(NodeHandle {
            kind,
            sender: producer,
        })
    }

    /// Node kinds in processing order
    pub fn kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.nodes.iter().map(GraphNode::kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tap(&self) -> Option<&Tap> {
        self.nodes.iter().find_map(|n| match n {
            GraphNode::Tap(s) => Some(s.node()),
            _ => None,
        })
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.nodes.iter().find_map(|n| match n {
            GraphNode::Filter(s) => Some(s.node()),
            _ => None,
        })
    }

    pub fn gain(&self) -> Option<&Gain> {
        self.nodes.iter().find_map(|n| match n {
            GraphNode::Gain(s) => Some(s.node()),
            _ => None,
        })
    }

    /// Run one quantum through every node in order
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let ctx = self.ctx;
        for node in self.nodes.iter_mut() {
            node.process(&ctx, left, right);
        }
    }
}

//! Audio graph - owns nodes and message queues

use alloc::boxed::Box;
use alloc::vec;
use core::marker::PhantomData;

use dasp_graph::{Buffer, Input, NodeData, Processor};
use hashbrown::HashMap;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::EngineError;
use crate::node::{AudioNode, NodeId, ProcessContext};

/// Handle to a node in an [`AudioGraph`].
///
/// Carries the node's id (for connecting and removing it) and the producer end
/// of its message queue.
pub struct Handle<M: Send + 'static> {
    pub(crate) id: NodeId,
    pub(crate) sender: Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

impl<M: Send + 'static> Handle<M> {
    /// Send a message to the node (applied next process cycle)
    ///
    /// Returns `Err(msg)` if the queue is full.
    pub fn send(&mut self, msg: M) -> Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(v)| v)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

// Type-erased wrapper so we can store heterogeneous nodes
trait ErasedNode: Send {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]);
}

struct NodeWrapper<N: AudioNode> {
    node: N,
    receiver: Consumer<N::Message>,
}

impl<N: AudioNode> ErasedNode for NodeWrapper<N> {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]) {
        // Split borrow to avoid conflict between receiver and node
        let receiver = &mut self.receiver;
        let node = &mut self.node;

        let messages = core::iter::from_fn(|| receiver.pop().ok());
        node.process(ctx, messages, inputs, outputs);
    }
}

// Adapter for dasp_graph
struct DaspAdapter {
    node: Box<dyn ErasedNode>,
    ctx: ProcessContext,
}

impl dasp_graph::Node for DaspAdapter {
    fn process(&mut self, inputs: &[Input], outputs: &mut [Buffer]) {
        self.node.process_erased(&self.ctx, inputs, outputs);
    }
}

// Stable indices: removing a track must not shift the indices of the others.
type InnerGraph = StableGraph<NodeData<DaspAdapter>, ()>;

/// An audio processing graph at a fixed sample rate.
///
/// Nodes are added and removed at runtime; one terminal node (normally the
/// output sink) is processed each block, pulling everything upstream of it.
pub struct AudioGraph {
    graph: InnerGraph,
    processor: Processor<InnerGraph>,
    ctx: ProcessContext,

    node_indices: HashMap<NodeId, NodeIndex>,
    next_node_id: u32,

    terminal: Option<NodeIndex>,
}

impl AudioGraph {
    /// Create a new graph with the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: InnerGraph::with_capacity(64, 64),
            processor: Processor::with_capacity(64),
            ctx: ProcessContext {
                sample_rate,
                buffer_size: Buffer::LEN,
            },
            node_indices: HashMap::new(),
            next_node_id: 0,
            terminal: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.ctx.sample_rate
    }

    /// Number of nodes currently in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Add a node, returns a handle for sending messages
    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        self.add_with_queue_size(node, 64)
    }

    /// Add a node with a custom message queue size
    pub fn add_with_queue_size<N: AudioNode>(&mut self, node: N, queue_size: usize) -> Handle<N::Message> {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let (producer, consumer) = RingBuffer::new(queue_size.max(1));

        let num_outputs = node.num_outputs();
        let wrapper = NodeWrapper { node, receiver: consumer };
        let adapter = DaspAdapter {
            node: Box::new(wrapper),
            ctx: self.ctx,
        };

        let node_data = match num_outputs {
            // 0 outputs = sink, but dasp_graph still needs a buffer for inputs
            0 | 1 => NodeData::new1(adapter),
            2 => NodeData::new2(adapter),
            n => NodeData::new(adapter, vec![Buffer::SILENT; n]),
        };

        let idx = self.graph.add_node(node_data);
        self.node_indices.insert(id, idx);

        Handle {
            id,
            sender: producer,
            _marker: PhantomData,
        }
    }

    /// Connect output of `from` to input of `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), EngineError> {
        let from_idx = self.index(from)?;
        let to_idx = self.index(to)?;
        self.graph.add_edge(from_idx, to_idx, ());
        Ok(())
    }

    /// Remove a node and all of its connections, dropping it.
    ///
    /// Returns `false` if the node was not in the graph.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(idx) = self.node_indices.remove(&id) else {
            return false;
        };
        if self.terminal == Some(idx) {
            self.terminal = None;
        }
        self.graph.remove_node(idx).is_some()
    }

    /// Set which node to process to (typically a sink)
    pub fn set_terminal(&mut self, id: NodeId) -> Result<(), EngineError> {
        self.terminal = Some(self.index(id)?);
        Ok(())
    }

    /// Process one block of audio through the graph
    pub fn process(&mut self) {
        if let Some(terminal) = self.terminal {
            self.processor.process(&mut self.graph, terminal);
        }
    }

    fn index(&self, id: NodeId) -> Result<NodeIndex, EngineError> {
        self.node_indices.get(&id).copied().ok_or(EngineError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Mixer, RtrbSink, Tone, ToneSpec};

    #[test]
    fn removing_a_node_keeps_the_others_addressable() {
        let mut graph = AudioGraph::new(48_000);
        let (producer, mut consumer) = RingBuffer::<f32>::new(4096);

        let sink = graph.add(RtrbSink::new(producer, 1));
        let mixer = graph.add(Mixer::new(1));
        let a = graph.add(Tone::new(ToneSpec::default(), 48_000));
        let b = graph.add(Tone::new(ToneSpec::default(), 48_000));

        graph.connect(mixer.id(), sink.id()).unwrap();
        graph.connect(a.id(), mixer.id()).unwrap();
        graph.connect(b.id(), mixer.id()).unwrap();
        graph.set_terminal(sink.id()).unwrap();

        assert!(graph.remove(a.id()));
        assert!(!graph.remove(a.id()));
        assert_eq!(graph.len(), 3);
        assert!(graph.contains(b.id()));
        assert_eq!(graph.connect(a.id(), mixer.id()), Err(EngineError::UnknownNode(a.id())));

        graph.process();
        assert_eq!(consumer.slots(), Buffer::LEN);
        let rendered: f32 = (0..Buffer::LEN).map(|_| consumer.pop().unwrap().abs()).sum();
        assert!(rendered > 0.0, "remaining tone should still reach the sink");
    }

    #[test]
    fn graph_without_terminal_renders_nothing() {
        let mut graph = AudioGraph::new(44_100);
        let (producer, consumer) = RingBuffer::<f32>::new(1024);
        let sink = graph.add(RtrbSink::new(producer, 2));
        graph.process();
        assert_eq!(consumer.slots(), 0);

        graph.set_terminal(sink.id()).unwrap();
        assert!(graph.remove(sink.id()));
        graph.process();
        assert!(graph.is_empty());
    }
}

use crate::config::Config;
use crate::nodes::{Node, NodeId, NodeKind};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

/// Arena of every live node on this thread plus the engine settings.
pub struct Graph {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) config: Config,
    pub(crate) cascade: Cascade,
}

/// Nesting depth of the running invalidation cascade and the nodes whose
/// change listeners wait for it to finish.
#[derive(Default)]
pub(crate) struct Cascade {
    depth: usize,
    pending: Vec<NodeId>,
    queued: FxHashSet<NodeId>,
}

impl Cascade {
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Queues a node once per cascade, keeping first-reached order.
    pub fn defer(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.pending.push(id);
        }
    }

    /// Hands out the queue, but only once the outermost cascade has returned.
    pub fn drain(&mut self) -> Vec<NodeId> {
        if self.depth > 0 {
            return Vec::new();
        }
        self.queued.clear();
        std::mem::take(&mut self.pending)
    }
}

/// Read-only description of a node, for debugging and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub label: &'static str,
    pub name: Option<String>,
    pub operator: Option<&'static str>,
    pub valid: bool,
    pub bound: bool,
    pub disposed: bool,
    /// Nodes this node subscribes to.
    pub dependencies: Vec<NodeId>,
    /// Nodes subscribed to this node.
    pub observers: Vec<NodeId>,
    pub listeners: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            config: Config::default(),
            cascade: Cascade::default(),
        }
    }

    pub(crate) fn allocate(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn describe(&self, id: NodeId) -> Option<NodeInfo> {
        let node = self.nodes.get(id)?;
        let (operator, bound) = match &node.kind {
            NodeKind::Binding(state) => (Some(state.operator.symbol()), false),
            NodeKind::Property(state) => (None, state.bound.is_some()),
            NodeKind::ReadOnly(_) => (None, false),
        };
        Some(NodeInfo {
            id,
            label: node.label,
            name: node.name().filter(|name| !name.is_empty()).map(str::to_owned),
            operator,
            valid: node.valid,
            bound,
            disposed: node.is_disposed(),
            dependencies: node.subscriptions().into_vec(),
            observers: node.helper.observers().collect(),
            listeners: node.helper.len(),
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

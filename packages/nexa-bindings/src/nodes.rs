use crate::context;
use crate::listener::ListenerHelper;
use crate::operator::Operator;
use crate::value::Value;
use slotmap::new_key_type;
use smallvec::SmallVec;
use std::rc::Rc;

new_key_type! {
    pub struct NodeId;
}

/// Owning handle to a node in the thread's graph. The node is removed when
/// the last handle goes away.
#[derive(Debug, Clone)]
pub struct NodeRef(Rc<NodeToken>);

#[derive(Debug)]
struct NodeToken {
    id: NodeId,
}

impl NodeRef {
    pub(crate) fn new(id: NodeId) -> Self {
        Self(Rc::new(NodeToken { id }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }
}

impl Drop for NodeToken {
    fn drop(&mut self) {
        context::release(self.id);
    }
}

/// An argument of a derived node: either a literal or another node.
#[derive(Debug, Clone)]
pub enum Operand {
    Constant(Value),
    Node(NodeRef),
}

impl Operand {
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Operand::Constant(_) => None,
            Operand::Node(node) => Some(node.id()),
        }
    }

    pub(crate) fn same_as(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Constant(a), Operand::Constant(b)) => a.is_same(b),
            (Operand::Node(a), Operand::Node(b)) => a.id() == b.id(),
            _ => false,
        }
    }

    pub(crate) fn read(&self) -> crate::Result<Value> {
        match self {
            Operand::Constant(value) => Ok(value.clone()),
            Operand::Node(node) => context::read(node.id()),
        }
    }
}

pub(crate) type Operands = SmallVec<[Operand; 2]>;

pub(crate) struct Node {
    pub label: &'static str,
    pub kind: NodeKind,
    pub valid: bool,
    pub helper: ListenerHelper,
    pub hook: Option<Rc<dyn Fn()>>,
}

pub(crate) enum NodeKind {
    Property(PropertyState),
    ReadOnly(ReadOnlyState),
    Binding(BindingState),
}

pub(crate) struct PropertyState {
    pub stored: Value,
    pub bound: Option<Bound>,
    pub bean: Option<String>,
    pub name: String,
}

/// Upstream subscription of a bound property: an internal mirror node over
/// `source`.
pub(crate) struct Bound {
    pub mirror: NodeRef,
    pub source: Operand,
    pub coerce: bool,
}

pub(crate) struct ReadOnlyState {
    pub source: Operand,
    pub coerce: bool,
    pub name: String,
}

pub(crate) struct BindingState {
    pub operator: Operator,
    pub operands: Operands,
    pub dependencies: SmallVec<[NodeRef; 2]>,
    pub cached: Option<Value>,
    pub disposed: bool,
}

impl PropertyState {
    /// `Bean.name : ` prefix used in error messages, empty when either half is missing.
    pub fn target(&self) -> String {
        match &self.bean {
            Some(bean) if !self.name.is_empty() => format!("{}.{} : ", bean, self.name),
            _ => String::new(),
        }
    }
}

impl Node {
    pub fn property(
        label: &'static str,
        stored: Value,
        bean: Option<String>,
        name: String,
    ) -> Self {
        Self {
            label,
            kind: NodeKind::Property(PropertyState {
                stored,
                bound: None,
                bean,
                name,
            }),
            valid: true,
            helper: ListenerHelper::default(),
            hook: None,
        }
    }

    pub fn read_only(label: &'static str, source: Operand, coerce: bool, name: String) -> Self {
        Self {
            label,
            kind: NodeKind::ReadOnly(ReadOnlyState {
                source,
                coerce,
                name,
            }),
            valid: true,
            helper: ListenerHelper::default(),
            hook: None,
        }
    }

    pub fn binding(
        label: &'static str,
        operator: Operator,
        operands: Operands,
        dependencies: SmallVec<[NodeRef; 2]>,
    ) -> Self {
        Self {
            label,
            kind: NodeKind::Binding(BindingState {
                operator,
                operands,
                dependencies,
                cached: None,
                disposed: false,
            }),
            // Derived nodes start stale so the first read computes.
            valid: false,
            helper: ListenerHelper::default(),
            hook: None,
        }
    }

    /// Nodes this node is registered on as an observer.
    pub fn subscriptions(&self) -> SmallVec<[NodeId; 2]> {
        match &self.kind {
            NodeKind::Property(state) => state
                .bound
                .as_ref()
                .map(|bound| bound.mirror.id())
                .into_iter()
                .collect(),
            NodeKind::ReadOnly(state) => state.source.node_id().into_iter().collect(),
            NodeKind::Binding(state) if !state.disposed => {
                state.dependencies.iter().map(NodeRef::id).collect()
            }
            NodeKind::Binding(_) => SmallVec::new(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(&self.kind, NodeKind::Binding(state) if state.disposed)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Property(state) => Some(state.name.as_str()),
            NodeKind::ReadOnly(state) => Some(state.name.as_str()),
            NodeKind::Binding(_) => None,
        }
    }
}

use crate::context;
use crate::error::{Error, Result};
use crate::nodes::{Node, NodeId, NodeKind, NodeRef, Operand, Operands};
use crate::observable::{Observable, ObservableValue, read_node};
use crate::operator::Operator;
use crate::value::NodeValue;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A lazily computed, cached node.
///
/// A binding starts invalid. Reading it recomputes when stale and caches the
/// result; an upstream change only marks it invalid and notifies its own
/// observers, it never recomputes eagerly.
pub struct Binding<T> {
    node: NodeRef,
    _marker: PhantomData<fn() -> T>,
}

pub type DecimalBinding = Binding<Decimal>;
pub type ObjectBinding = Binding<Option<Decimal>>;
pub type BooleanBinding = Binding<bool>;
pub type StringBinding = Binding<String>;

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: NodeValue> Binding<T> {
    /// A binding with a custom compute rule.
    ///
    /// `dependencies` are the nodes whose invalidation marks this binding
    /// stale; the closure is expected to read them. Errors from `compute`
    /// surface at `get()`.
    pub fn new<F>(dependencies: &[&dyn Observable], compute: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        let mut nodes: SmallVec<[NodeRef; 2]> = SmallVec::new();
        for dependency in dependencies {
            let Some(node) = dependency.node() else {
                continue;
            };
            if !context::is_live(node.id()) {
                return Err(Error::Disposed);
            }
            if !nodes.iter().any(|existing| existing.id() == node.id()) {
                nodes.push(node.clone());
            }
        }
        let operator = Operator::Compute(Rc::new(move || compute().map(T::into_value)));
        Ok(Self::build(operator, Operands::new(), nodes))
    }

    /// A combinator node. Dependencies are the distinct node operands;
    /// constants contribute none.
    pub(crate) fn from_operator(operator: Operator, operands: Operands) -> Self {
        let mut nodes: SmallVec<[NodeRef; 2]> = SmallVec::new();
        for operand in &operands {
            if let Operand::Node(node) = operand {
                if !nodes.iter().any(|existing| existing.id() == node.id()) {
                    nodes.push(node.clone());
                }
            }
        }
        Self::build(operator, operands, nodes)
    }

    fn build(operator: Operator, operands: Operands, dependencies: SmallVec<[NodeRef; 2]>) -> Self {
        let ids: SmallVec<[NodeId; 2]> = dependencies.iter().map(NodeRef::id).collect();
        let op = operator.symbol();
        let node = context::allocate(Node::binding(T::LABEL, operator, operands, dependencies));
        for dependency in &ids {
            context::subscribe(*dependency, node.id());
        }
        tracing::trace!(id = ?node.id(), op, dependencies = ids.len(), "binding created");
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Marks the binding stale from outside, as if a dependency had changed.
    pub fn invalidate(&self) {
        context::invalidate(self.node.id());
    }

    pub fn is_valid(&self) -> bool {
        context::is_valid(self.node.id())
    }

    /// Unsubscribes from every dependency. The binding can no longer be read
    /// or used as an operand. Idempotent.
    pub fn dispose(&self) {
        context::dispose(self.node.id());
    }

    pub fn is_disposed(&self) -> bool {
        !context::is_live(self.node.id())
    }

    /// Nodes this binding is subscribed to, in declaration order.
    pub fn dependencies(&self) -> Vec<NodeId> {
        context::with_graph(|g| match g.nodes.get(self.node.id()) {
            Some(node) => node.subscriptions().into_vec(),
            None => Vec::new(),
        })
    }

    /// Runs `hook` on each valid → invalid transition, before listeners fire.
    ///
    /// A hook that captures a handle to this binding keeps it alive.
    pub fn set_on_invalidating(&self, hook: impl Fn() + 'static) {
        context::set_hook(self.node.id(), Some(Rc::new(hook)));
    }

    pub fn clear_on_invalidating(&self) {
        context::set_hook(self.node.id(), None);
    }

    pub(crate) fn into_node(self) -> NodeRef {
        self.node
    }
}

impl<T: NodeValue> Observable for Binding<T> {
    fn node(&self) -> Option<&NodeRef> {
        Some(&self.node)
    }
}

impl<T: NodeValue> ObservableValue for Binding<T> {
    type Value = T;

    fn get(&self) -> Result<T> {
        read_node(&self.node)
    }
}

impl<T: NodeValue> fmt::Display for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.node.id();
        let cached = context::with_graph(|g| match g.nodes.get(id) {
            Some(Node {
                valid: true,
                kind: NodeKind::Binding(state),
                ..
            }) => state.cached.clone(),
            _ => None,
        });
        match cached {
            Some(value) => write!(f, "{}Binding [value: {}]", T::LABEL, value),
            None => write!(f, "{}Binding [invalid]", T::LABEL),
        }
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("id", &self.node.id()).finish()
    }
}

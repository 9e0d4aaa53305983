//! Thread-local graph and the invalidation/recomputation protocol.
//!
//! Nothing here holds a borrow of the graph while user code runs: state is
//! copied out, the borrow is released, and only then are listeners or compute
//! rules invoked. That is what lets listeners read, write and rebind nodes
//! from inside a notification.

use crate::config::{Config, DivisionPolicy};
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeInfo};
use crate::listener::{Dispatch, ErasedChange, InvalidationListener};
use crate::nodes::{Node, NodeId, NodeKind, NodeRef, Operand, Operands};
use crate::operator::Operator;
use crate::value::Value;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    pub static GRAPH: RefCell<Graph> = RefCell::new(Graph::new());
}

pub fn with_graph<F, R>(f: F) -> R
where
    F: FnOnce(&Graph) -> R,
{
    GRAPH.with(|g| f(&g.borrow()))
}

pub(crate) fn with_graph_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut Graph) -> R,
{
    GRAPH.with(|g| f(&mut g.borrow_mut()))
}

/// Replaces the engine settings of the current thread.
pub fn configure(config: Config) {
    tracing::debug!(?config, "engine configured");
    with_graph_mut(|g| g.config = config);
}

pub fn config() -> Config {
    with_graph(|g| g.config())
}

/// Number of nodes currently alive on this thread.
pub fn live_nodes() -> usize {
    with_graph(|g| g.len())
}

pub fn describe(id: NodeId) -> Option<NodeInfo> {
    with_graph(|g| g.describe(id))
}

pub(crate) fn allocate(node: Node) -> NodeRef {
    let label = node.label;
    let id = with_graph_mut(|g| g.allocate(node));
    tracing::trace!(?id, label, "node allocated");
    NodeRef::new(id)
}

/// Removes a node whose last handle was dropped and detaches it from
/// everything it observed.
pub(crate) fn release(id: NodeId) {
    let removed = GRAPH
        .try_with(|g| match g.try_borrow_mut() {
            Ok(mut graph) => graph.nodes.remove(id),
            Err(_) => {
                tracing::warn!(?id, "graph busy while releasing node, leaking it");
                None
            }
        })
        .ok()
        .flatten();

    // The thread is shutting down or the node is already gone.
    let Some(node) = removed else { return };

    for dependency in node.subscriptions() {
        unsubscribe(dependency, id);
    }
    tracing::trace!(?id, label = node.label, "node released");
    // Dropping the node drops its operand handles, which may release more nodes.
    drop(node);
}

pub(crate) fn is_live(id: NodeId) -> bool {
    with_graph(|g| g.nodes.get(id).is_some_and(|node| !node.is_disposed()))
}

pub(crate) fn name_of(id: NodeId) -> String {
    with_graph(|g| {
        g.nodes
            .get(id)
            .and_then(|node| node.name())
            .unwrap_or_default()
            .to_owned()
    })
}

pub(crate) fn is_valid(id: NodeId) -> bool {
    with_graph(|g| g.nodes.get(id).is_some_and(|node| node.valid))
}

pub(crate) fn set_hook(id: NodeId, hook: Option<Rc<dyn Fn()>>) {
    let previous = with_graph_mut(|g| {
        g.nodes
            .get_mut(id)
            .and_then(|node| std::mem::replace(&mut node.hook, hook))
    });
    drop(previous);
}

enum Step {
    Ready(Value),
    Mirror(Operand, bool),
    Compute(Operator, Operands, DivisionPolicy),
}

/// Resolves the current value of a node, recomputing it if it is stale.
///
/// Reading a property or read-only property always marks it valid again.
/// Recomputation never notifies anyone; only the transition into the invalid
/// state is observable.
pub(crate) fn read(id: NodeId) -> Result<Value> {
    let step = with_graph_mut(|g| {
        let division = g.config.division;
        let node = g.nodes.get_mut(id).ok_or(Error::Disposed)?;
        let step = match &node.kind {
            NodeKind::Property(state) => {
                node.valid = true;
                match &state.bound {
                    Some(bound) => Step::Mirror(Operand::Node(bound.mirror.clone()), false),
                    None => Step::Ready(state.stored.clone()),
                }
            }
            NodeKind::ReadOnly(state) => {
                node.valid = true;
                Step::Mirror(state.source.clone(), state.coerce)
            }
            NodeKind::Binding(state) => {
                if state.disposed {
                    return Err(Error::Disposed);
                }
                match (&state.cached, node.valid) {
                    (Some(value), true) => Step::Ready(value.clone()),
                    _ => Step::Compute(state.operator.clone(), state.operands.clone(), division),
                }
            }
        };
        Ok(step)
    })?;

    match step {
        Step::Ready(value) => Ok(value),
        Step::Mirror(source, coerce) => {
            let value = source.read()?;
            if coerce {
                Ok(Value::Decimal(value.zero_if_absent()?))
            } else {
                Ok(value)
            }
        }
        Step::Compute(operator, operands, division) => {
            tracing::trace!(?id, op = operator.symbol(), "recomputing");
            // An error leaves the node invalid so the next read tries again.
            let value = operator.evaluate(&operands, division)?;
            with_graph_mut(|g| {
                if let Some(node) = g.nodes.get_mut(id) {
                    if let NodeKind::Binding(state) = &mut node.kind {
                        if !state.disposed {
                            state.cached = Some(value.clone());
                            node.valid = true;
                        }
                    }
                }
            });
            Ok(value)
        }
    }
}

enum Transition {
    Unchanged,
    Invalidated(Option<Rc<dyn Fn()>>),
}

/// Keeps the cascade depth balanced even if a listener unwinds.
struct CascadeScope;

impl CascadeScope {
    fn enter() -> Self {
        with_graph_mut(|g| g.cascade.enter());
        CascadeScope
    }
}

impl Drop for CascadeScope {
    fn drop(&mut self) {
        let _ = GRAPH.try_with(|g| {
            if let Ok(mut graph) = g.try_borrow_mut() {
                graph.cascade.leave();
            }
        });
    }
}

/// Moves a node from valid to invalid and notifies its listeners.
///
/// The cascade itself is synchronous and depth-first. Change listeners of the
/// nodes it reaches are queued and only run once the outermost call has
/// finished, so they never see a half-invalidated graph.
pub(crate) fn invalidate(id: NodeId) {
    {
        let _scope = CascadeScope::enter();
        propagate(id);
    }

    let pending = with_graph_mut(|g| g.cascade.drain());
    for node in pending {
        notify_change(node);
    }
}

/// A no-op for nodes that are already invalid or gone, which is what stops a
/// diamond from notifying its tip twice.
fn propagate(id: NodeId) {
    let transition = with_graph_mut(|g| match g.nodes.get_mut(id) {
        Some(node) if node.valid && !node.is_disposed() => {
            node.valid = false;
            Transition::Invalidated(node.hook.clone())
        }
        _ => Transition::Unchanged,
    });

    if let Transition::Invalidated(hook) = transition {
        tracing::trace!(?id, "invalidated");
        if let Some(hook) = hook {
            hook();
        }
        fire(id);
    }
}

fn fire(id: NodeId) {
    let Some(targets) = with_graph(|g| g.nodes.get(id).map(|node| node.helper.snapshot())) else {
        return;
    };

    for target in targets {
        match target {
            Dispatch::Listener(listener) => listener.call(id),
            Dispatch::Observer(observer) => propagate(observer),
        }
    }

    with_graph_mut(|g| {
        if g.nodes.get(id).is_some_and(|node| node.helper.has_change_listeners()) {
            g.cascade.defer(id);
        }
    });
}

/// Change listeners need the new value, so this is the one place where an
/// invalidation forces recomputation.
fn notify_change(id: NodeId) {
    let listeners = with_graph(|g| {
        g.nodes
            .get(id)
            .map(|node| node.helper.changes())
            .unwrap_or_default()
    });
    if listeners.is_empty() {
        return;
    }

    let new = match read(id) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(?id, %err, "failed to compute value for change listeners");
            return;
        }
    };

    let old = with_graph_mut(|g| {
        g.nodes
            .get_mut(id)
            .and_then(|node| node.helper.current.replace(new.clone()))
    });

    match old {
        Some(old) if !old.is_same(&new) => {
            for listener in &listeners {
                listener(id, &old, &new);
            }
        }
        _ => {}
    }
}

pub(crate) fn subscribe(dependency: NodeId, observer: NodeId) {
    with_graph_mut(|g| {
        if let Some(node) = g.nodes.get_mut(dependency) {
            node.helper.add_observer(observer);
        }
    });
}

pub(crate) fn unsubscribe(dependency: NodeId, observer: NodeId) {
    with_graph_mut(|g| {
        if let Some(node) = g.nodes.get_mut(dependency) {
            node.helper.remove_observer(observer);
        }
    });
}

pub fn add_invalidation_listener(id: NodeId, listener: &InvalidationListener) {
    with_graph_mut(|g| {
        if let Some(node) = g.nodes.get_mut(id) {
            node.helper.add_invalidation(listener);
        }
    });
}

pub fn remove_invalidation_listener(id: NodeId, listener: &InvalidationListener) {
    let removed = with_graph_mut(|g| {
        g.nodes
            .get_mut(id)
            .and_then(|node| node.helper.remove_invalidation(listener))
    });
    drop(removed);
}

pub(crate) fn add_change_listener(id: NodeId, key: usize, callback: ErasedChange) {
    let first = with_graph_mut(|g| {
        g.nodes
            .get_mut(id)
            .is_some_and(|node| node.helper.add_change(key, callback))
    });
    if !first {
        return;
    }

    // Change listeners compare against the value at registration time.
    match read(id) {
        Ok(value) => with_graph_mut(|g| {
            if let Some(node) = g.nodes.get_mut(id) {
                if node.helper.has_change_listeners() && node.helper.current.is_none() {
                    node.helper.current = Some(value);
                }
            }
        }),
        Err(err) => tracing::warn!(?id, %err, "could not read initial value for change listener"),
    }
}

pub(crate) fn remove_change_listener(id: NodeId, key: usize) {
    let removed = with_graph_mut(|g| {
        g.nodes
            .get_mut(id)
            .and_then(|node| node.helper.remove_change(key))
    });
    drop(removed);
}

/// Marks a derived node as disposed and detaches it from its dependencies.
/// Safe to call any number of times.
pub(crate) fn dispose(id: NodeId) {
    let dependencies = with_graph_mut(|g| {
        let node = g.nodes.get_mut(id)?;
        let NodeKind::Binding(state) = &mut node.kind else {
            return None;
        };
        if state.disposed {
            return None;
        }
        state.disposed = true;
        state.cached = None;
        node.valid = false;
        Some(
            state
                .dependencies
                .iter()
                .map(NodeRef::id)
                .collect::<SmallVec<[NodeId; 2]>>(),
        )
    });

    if let Some(dependencies) = dependencies {
        for dependency in &dependencies {
            unsubscribe(*dependency, id);
        }
        tracing::debug!(?id, dependencies = dependencies.len(), "binding disposed");
    }
}

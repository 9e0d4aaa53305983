//! Listener bookkeeping for a single node.
//!
//! Every node carries one [`ListenerHelper`]. It records three kinds of
//! entries in registration order:
//!
//! - user invalidation listeners, called with the node id on each
//!   valid → invalid transition,
//! - user change listeners, called with `(node, old, new)` when the resolved
//!   value actually differs from the last one they were shown,
//! - observer entries, the non-owning back-references derived nodes and bound
//!   properties use to subscribe to their dependencies.
//!
//! Dispatch always works on a copy of the entries so listeners may add or
//! remove entries (including themselves) while a notification is running.

use crate::nodes::NodeId;
use crate::value::{NodeValue, Value};
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Callback fired with the id of a node that just became stale.
///
/// Identity is the shared closure: clones of one listener are the same
/// listener for `add`/`remove` purposes.
#[derive(Clone)]
pub struct InvalidationListener(Rc<dyn Fn(NodeId)>);

impl InvalidationListener {
    pub fn new(f: impl Fn(NodeId) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn call(&self, id: NodeId) {
        (self.0)(id)
    }
}

impl fmt::Debug for InvalidationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InvalidationListener").field(&self.key()).finish()
    }
}

pub(crate) type ErasedChange = Rc<dyn Fn(NodeId, &Value, &Value)>;

/// Callback fired with `(node, old, new)` when a node's resolved value changes.
pub struct ChangeListener<T>(Rc<dyn Fn(NodeId, &T, &T)>);

impl<T> Clone for ChangeListener<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: NodeValue> ChangeListener<T> {
    pub fn new(f: impl Fn(NodeId, &T, &T) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn erase(&self) -> ErasedChange {
        let f = self.0.clone();
        Rc::new(move |id: NodeId, old: &Value, new: &Value| {
            if let (Some(old), Some(new)) = (T::peek(old), T::peek(new)) {
                f(id, old, new);
            }
        })
    }
}

impl<T> fmt::Debug for ChangeListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangeListener")
    }
}

enum Entry {
    Invalidation {
        listener: InvalidationListener,
        count: usize,
    },
    Change {
        key: usize,
        callback: ErasedChange,
        count: usize,
    },
    Observer(NodeId),
}

/// A listener entry taken out of a helper. Its closure may own node handles.
pub(crate) struct Removed(#[allow(dead_code)] Entry);

pub(crate) enum Dispatch {
    Listener(InvalidationListener),
    Observer(NodeId),
}

#[derive(Default)]
pub(crate) struct ListenerHelper {
    entries: Vec<Entry>,
    /// Last value delivered to change listeners; `None` until one is registered.
    pub current: Option<Value>,
}

impl ListenerHelper {
    pub fn add_invalidation(&mut self, listener: &InvalidationListener) {
        let key = listener.key();
        for entry in &mut self.entries {
            if let Entry::Invalidation { listener, count } = entry {
                if listener.key() == key {
                    *count += 1;
                    return;
                }
            }
        }
        self.entries.push(Entry::Invalidation {
            listener: listener.clone(),
            count: 1,
        });
    }

    /// Returns the entry once its last registration is removed, so the caller
    /// can drop it outside any graph borrow.
    pub fn remove_invalidation(&mut self, listener: &InvalidationListener) -> Option<Removed> {
        let key = listener.key();
        self.release(|entry| match entry {
            Entry::Invalidation { listener, count } if listener.key() == key => Some(count),
            _ => None,
        })
    }

    /// Returns `true` when this is the first change listener on the node.
    pub fn add_change(&mut self, key: usize, callback: ErasedChange) -> bool {
        let first = !self.has_change_listeners();
        for entry in &mut self.entries {
            if let Entry::Change { key: existing, count, .. } = entry {
                if *existing == key {
                    *count += 1;
                    return false;
                }
            }
        }
        self.entries.push(Entry::Change {
            key,
            callback,
            count: 1,
        });
        first
    }

    pub fn remove_change(&mut self, key: usize) -> Option<Removed> {
        let removed = self.release(|entry| match entry {
            Entry::Change {
                key: existing,
                count,
                ..
            } if *existing == key => Some(count),
            _ => None,
        });
        if !self.has_change_listeners() {
            self.current = None;
        }
        removed
    }

    pub fn add_observer(&mut self, observer: NodeId) {
        let present = self
            .entries
            .iter()
            .any(|entry| matches!(entry, Entry::Observer(id) if *id == observer));
        if !present {
            self.entries.push(Entry::Observer(observer));
        }
    }

    pub fn remove_observer(&mut self, observer: NodeId) {
        self.entries
            .retain(|entry| !matches!(entry, Entry::Observer(id) if *id == observer));
    }

    pub fn has_change_listeners(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Change { .. }))
    }

    pub fn observers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Observer(id) => Some(*id),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Invalidation listeners and observers, in registration order.
    pub fn snapshot(&self) -> SmallVec<[Dispatch; 4]> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Invalidation { listener, .. } => Some(Dispatch::Listener(listener.clone())),
                Entry::Observer(id) => Some(Dispatch::Observer(*id)),
                Entry::Change { .. } => None,
            })
            .collect()
    }

    pub fn changes(&self) -> SmallVec<[ErasedChange; 2]> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Change { callback, .. } => Some(callback.clone()),
                _ => None,
            })
            .collect()
    }

    fn release(
        &mut self,
        mut select: impl FnMut(&mut Entry) -> Option<&mut usize>,
    ) -> Option<Removed> {
        let mut emptied = None;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(count) = select(entry) {
                *count -= 1;
                if *count == 0 {
                    emptied = Some(index);
                }
                break;
            }
        }
        emptied.map(|index| Removed(self.entries.remove(index)))
    }
}

use crate::binding::Binding;
use crate::context;
use crate::error::{Error, Result};
use crate::nodes::{Bound, Node, NodeId, NodeKind, NodeRef, Operand, PropertyState};
use crate::observable::{Observable, ObservableValue, read_node};
use crate::operator::Operator;
use crate::read_only::ReadOnlyProperty;
use crate::value::NodeValue;
use rust_decimal::Decimal;
use smallvec::smallvec;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A mutable value holder that can alternatively mirror an upstream source.
///
/// While bound, writes are rejected and `get()` returns the upstream value.
/// Bean and name are diagnostic only; they appear in `Display` output and in
/// error messages but play no part in identity.
pub struct Property<T> {
    node: NodeRef,
    _marker: PhantomData<fn() -> T>,
}

pub type DecimalProperty = Property<Decimal>;
pub type ObjectProperty = Property<Option<Decimal>>;

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: NodeValue> Property<T> {
    pub fn new(initial: T) -> Self {
        Self::named(None, "", initial)
    }

    pub fn named(bean: Option<&str>, name: &str, initial: T) -> Self {
        let node = context::allocate(Node::property(
            T::LABEL,
            initial.into_value(),
            bean.map(str::to_owned),
            name.to_owned(),
        ));
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Stores `value` and notifies if it differs from the stored value.
    ///
    /// Equality is by representation, so `1.0` replacing `1.00` notifies.
    pub fn set(&self, value: T) -> Result<()> {
        let id = self.node.id();
        let value = value.into_value();
        let changed = self.with_state(|state| {
            if state.bound.is_some() {
                return Err(Error::BoundValueCannotBeSet {
                    target: state.target(),
                });
            }
            if state.stored.is_same(&value) {
                return Ok(false);
            }
            state.stored = value;
            Ok(true)
        })?;
        if changed {
            context::invalidate(id);
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.with_state(|state| Ok(state.bound.is_some()))
            .unwrap_or_default()
    }

    /// Mirrors `source` until [`unbind`](Self::unbind) or another `bind`.
    ///
    /// Binding to the source this property already mirrors is a no-op; any
    /// other previous binding is torn down first.
    pub fn bind<S>(&self, source: &S) -> Result<()>
    where
        S: ObservableValue<Value = T> + ?Sized,
    {
        self.attach(source.operand()?, false)
    }

    pub fn unbind(&self) {
        let id = self.node.id();
        if !self.is_bound() {
            return;
        }

        let captured = context::read(id);
        let bound = self
            .with_state(|state| {
                if let Ok(value) = &captured {
                    state.stored = value.clone();
                }
                Ok(state.bound.take())
            })
            .ok()
            .flatten();

        if let Err(err) = &captured {
            tracing::warn!(?id, %err, "could not capture upstream value on unbind, keeping previous value");
        }
        if let Some(bound) = bound {
            context::unsubscribe(bound.mirror.id(), id);
            tracing::debug!(?id, mirror = ?bound.mirror.id(), "property unbound");
            // Releases the mirror node outside the graph borrow.
            drop(bound);
        }
    }

    pub fn bean(&self) -> Option<String> {
        self.with_state(|state| Ok(state.bean.clone()))
            .ok()
            .flatten()
    }

    pub fn name(&self) -> String {
        context::name_of(self.node.id())
    }

    /// Runs `hook` on each valid → invalid transition, before listeners fire.
    pub fn set_on_invalidated(&self, hook: impl Fn() + 'static) {
        context::set_hook(self.node.id(), Some(Rc::new(hook)));
    }

    /// A read-only view that tracks this property.
    pub fn read_only(&self) -> ReadOnlyProperty<T> {
        ReadOnlyProperty::view(self.node.clone(), self.name())
    }

    pub(crate) fn attach(&self, source: Operand, coerce: bool) -> Result<()> {
        let id = self.node.id();
        let unchanged = self.with_state(|state| {
            Ok(state
                .bound
                .as_ref()
                .is_some_and(|bound| bound.coerce == coerce && bound.source.same_as(&source)))
        })?;
        if unchanged {
            return Ok(());
        }

        self.unbind();

        let operator = if coerce {
            Operator::ZeroIfAbsent
        } else {
            Operator::Identity
        };
        let mirror = Binding::<T>::from_operator(operator, smallvec![source.clone()]).into_node();
        context::subscribe(mirror.id(), id);
        tracing::debug!(?id, mirror = ?mirror.id(), "property bound");
        self.with_state(|state| {
            state.bound = Some(Bound {
                mirror,
                source,
                coerce,
            });
            Ok(())
        })?;

        context::invalidate(id);
        Ok(())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PropertyState) -> Result<R>) -> Result<R> {
        context::with_graph_mut(|g| match g.nodes.get_mut(self.node.id()) {
            Some(Node {
                kind: NodeKind::Property(state),
                ..
            }) => f(state),
            _ => Err(Error::Disposed),
        })
    }
}

impl DecimalProperty {
    /// Nullable write. An absent value is stored as zero.
    pub fn set_value(&self, value: Option<Decimal>) -> Result<()> {
        match value {
            Some(value) => self.set(value),
            None => {
                tracing::debug!(id = ?self.node.id(), "null written to decimal property, storing zero");
                self.set(Decimal::ZERO)
            }
        }
    }

    /// Mirrors a nullable source, reading an absent value as zero.
    pub fn bind_optional<S>(&self, source: &S) -> Result<()>
    where
        S: ObservableValue<Value = Option<Decimal>> + ?Sized,
    {
        self.attach(source.operand()?, true)
    }
}

impl<T: NodeValue> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default_value())
    }
}

impl<T: NodeValue> Observable for Property<T> {
    fn node(&self) -> Option<&NodeRef> {
        Some(&self.node)
    }
}

impl<T: NodeValue> ObservableValue for Property<T> {
    type Value = T;

    fn get(&self) -> Result<T> {
        read_node(&self.node)
    }
}

impl<T: NodeValue> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (bean, name, bound, valid) = context::with_graph(|g| match g.nodes.get(self.node.id()) {
            Some(Node {
                kind: NodeKind::Property(state),
                valid,
                ..
            }) => (
                state.bean.clone(),
                state.name.clone(),
                state.bound.is_some(),
                *valid,
            ),
            _ => (None, String::new(), false, false),
        });

        write!(f, "{}Property [", T::LABEL)?;
        if let Some(bean) = bean {
            write!(f, "bean: {bean}, ")?;
        }
        if !name.is_empty() {
            write!(f, "name: {name}, ")?;
        }
        if bound {
            f.write_str("bound, ")?;
            if !valid {
                return f.write_str("invalid]");
            }
        }
        match context::read(self.node.id()) {
            Ok(value) => write!(f, "value: {value}]"),
            Err(err) => write!(f, "error: {err}]"),
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("id", &self.node.id()).finish()
    }
}

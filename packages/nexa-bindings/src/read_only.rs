use crate::context;
use crate::error::Result;
use crate::nodes::{Node, NodeId, NodeRef, Operand};
use crate::observable::{Observable, ObservableValue, read_node};
use crate::value::NodeValue;
use rust_decimal::Decimal;
use std::fmt;
use std::marker::PhantomData;

/// A value holder with no `set` or `bind`, tracking some other source.
pub struct ReadOnlyProperty<T> {
    node: NodeRef,
    _marker: PhantomData<fn() -> T>,
}

pub type ReadOnlyDecimalProperty = ReadOnlyProperty<Decimal>;
pub type ReadOnlyObjectProperty = ReadOnlyProperty<Option<Decimal>>;

impl<T> Clone for ReadOnlyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: NodeValue> ReadOnlyProperty<T> {
    /// Read-only adapter over any source of the same value type.
    pub fn wrap<S>(source: &S) -> Result<Self>
    where
        S: ObservableValue<Value = T> + ?Sized,
    {
        Ok(Self::attach(source.operand()?, false, String::new()))
    }

    pub(crate) fn view(source: NodeRef, name: String) -> Self {
        Self::attach(Operand::Node(source), false, name)
    }

    fn attach(source: Operand, coerce: bool, name: String) -> Self {
        let dependency = source.node_id();
        let node = context::allocate(Node::read_only(T::LABEL, source, coerce, name));
        if let Some(dependency) = dependency {
            context::subscribe(dependency, node.id());
        }
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn name(&self) -> String {
        context::name_of(self.node.id())
    }

    /// Read-only properties created here never have an owning bean.
    pub fn bean(&self) -> Option<String> {
        None
    }
}

impl ReadOnlyDecimalProperty {
    /// Read-only decimal adapter over a nullable source; absent reads as zero.
    pub fn wrap_optional<S>(source: &S) -> Result<Self>
    where
        S: ObservableValue<Value = Option<Decimal>> + ?Sized,
    {
        Ok(Self::attach(source.operand()?, true, String::new()))
    }
}

impl<T: NodeValue> Observable for ReadOnlyProperty<T> {
    fn node(&self) -> Option<&NodeRef> {
        Some(&self.node)
    }
}

impl<T: NodeValue> ObservableValue for ReadOnlyProperty<T> {
    type Value = T;

    fn get(&self) -> Result<T> {
        read_node(&self.node)
    }
}

impl<T: NodeValue> fmt::Display for ReadOnlyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadOnly{}Property [", T::LABEL)?;
        let name = self.name();
        if !name.is_empty() {
            write!(f, "name: {name}, ")?;
        }
        match context::read(self.node.id()) {
            Ok(value) => write!(f, "value: {value}]"),
            Err(err) => write!(f, "error: {err}]"),
        }
    }
}

impl<T> fmt::Debug for ReadOnlyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyProperty")
            .field("id", &self.node.id())
            .finish()
    }
}

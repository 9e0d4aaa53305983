//! Capability traits shared by every value holder.

use crate::constant::Constant;
use crate::context;
use crate::error::{Error, Result};
use crate::listener::{ChangeListener, InvalidationListener};
use crate::nodes::{NodeId, NodeRef, Operand};
use crate::value::{self, NodeValue, Value};
use rust_decimal::Decimal;

/// Anything listeners can be attached to.
///
/// Holders without a graph node (constants) accept registrations and ignore
/// them, since they never change.
pub trait Observable {
    fn node(&self) -> Option<&NodeRef>;

    fn id(&self) -> Option<NodeId> {
        self.node().map(NodeRef::id)
    }

    fn add_listener(&self, listener: &InvalidationListener) {
        if let Some(node) = self.node() {
            context::add_invalidation_listener(node.id(), listener);
        }
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        if let Some(node) = self.node() {
            context::remove_invalidation_listener(node.id(), listener);
        }
    }
}

pub trait ObservableValue: Observable {
    type Value: NodeValue;

    fn get(&self) -> Result<Self::Value>;

    fn add_change_listener(&self, listener: &ChangeListener<Self::Value>) {
        if let Some(node) = self.node() {
            context::add_change_listener(node.id(), listener.key(), listener.erase());
        }
    }

    fn remove_change_listener(&self, listener: &ChangeListener<Self::Value>) {
        if let Some(node) = self.node() {
            context::remove_change_listener(node.id(), listener.key());
        }
    }

    /// The operand a derived node stores to read this holder.
    ///
    /// Fails with [`Error::Disposed`] for a disposed binding, before anything
    /// is built on top of it.
    fn operand(&self) -> Result<Operand> {
        match self.node() {
            Some(node) if context::is_live(node.id()) => Ok(Operand::Node(node.clone())),
            Some(_) => Err(Error::Disposed),
            None => Ok(Operand::Constant(self.get()?.into_value())),
        }
    }
}

/// Numeric coercions of a decimal holder, all derived from `get()`.
pub trait NumericValue: ObservableValue<Value = Decimal> {
    fn int_value(&self) -> Result<i32> {
        Ok(value::int_value(&self.get()?))
    }

    fn long_value(&self) -> Result<i64> {
        Ok(value::long_value(&self.get()?))
    }

    fn float_value(&self) -> Result<f32> {
        Ok(value::float_value(&self.get()?))
    }

    fn double_value(&self) -> Result<f64> {
        Ok(value::double_value(&self.get()?))
    }
}

impl<T: ObservableValue<Value = Decimal> + ?Sized> NumericValue for T {}

pub(crate) fn read_node<T: NodeValue>(node: &NodeRef) -> Result<T> {
    T::from_value(&context::read(node.id())?)
}

/// Anything usable as a decimal operand of a combinator: a reactive holder or
/// a literal. Literals become constants and never subscribe to anything.
pub trait IntoOperand {
    fn into_operand(self) -> Result<Operand>;
}

impl<T: ObservableValue<Value = Decimal> + ?Sized> IntoOperand for &T {
    fn into_operand(self) -> Result<Operand> {
        self.operand()
    }
}

impl IntoOperand for Constant {
    fn into_operand(self) -> Result<Operand> {
        Ok(Operand::Constant(Value::Decimal(self.value())))
    }
}

impl IntoOperand for Decimal {
    fn into_operand(self) -> Result<Operand> {
        Constant::new(self).into_operand()
    }
}

impl IntoOperand for i32 {
    fn into_operand(self) -> Result<Operand> {
        Constant::from_i32(self).into_operand()
    }
}

impl IntoOperand for i64 {
    fn into_operand(self) -> Result<Operand> {
        Constant::from_i64(self).into_operand()
    }
}

impl IntoOperand for f32 {
    fn into_operand(self) -> Result<Operand> {
        Constant::from_f32(self)?.into_operand()
    }
}

impl IntoOperand for f64 {
    fn into_operand(self) -> Result<Operand> {
        Constant::from_f64(self)?.into_operand()
    }
}

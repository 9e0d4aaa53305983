//! # nexa-bindings
//!
//! Lazy, cached property bindings over exact decimals.
//!
//! Mutable [`Property`] nodes are the sources of a graph; [`Binding`] nodes
//! derive from them through the combinators in [`bindings`] or the fluent
//! [`DecimalExpression`] methods. Writing a property only marks downstream
//! bindings invalid. A binding recomputes when it is next read, or as soon as
//! the write has finished propagating if a change listener needs its value.
//!
//! ```
//! use nexa_bindings::{DecimalExpression, DecimalProperty, ObservableValue};
//! use rust_decimal::Decimal;
//!
//! let price = DecimalProperty::new(Decimal::new(1999, 2));
//! let quantity = DecimalProperty::new(Decimal::from(3));
//! let total = price.multiply(&quantity).unwrap();
//!
//! quantity.set(Decimal::from(4)).unwrap();
//! assert_eq!(total.get().unwrap(), Decimal::new(7996, 2));
//! ```
//!
//! The graph lives in a thread-local arena; handles are `!Send` and every
//! operation runs synchronously on the calling thread.

pub mod binding;
pub mod bindings;
pub mod config;
pub mod constant;
pub mod context;
pub mod error;
pub mod expression;
pub mod format;
pub mod graph;
pub mod listener;
pub mod nodes;
pub mod observable;
pub mod operator;
pub mod property;
pub mod read_only;
pub mod value;

pub use binding::{Binding, BooleanBinding, DecimalBinding, ObjectBinding, StringBinding};
pub use config::{Config, DivisionPolicy, Rounding};
pub use constant::Constant;
pub use error::{Error, Result};
pub use expression::{DecimalExpression, decimal_expression, decimal_expression_optional};
pub use format::{DecimalFormatter, PlainFormatter};
pub use graph::{Graph, NodeInfo};
pub use listener::{ChangeListener, InvalidationListener};
pub use nodes::{NodeId, NodeRef};
pub use observable::{IntoOperand, NumericValue, Observable, ObservableValue};
pub use property::{DecimalProperty, ObjectProperty, Property};
pub use read_only::{ReadOnlyDecimalProperty, ReadOnlyObjectProperty, ReadOnlyProperty};
pub use value::{NodeValue, Value};

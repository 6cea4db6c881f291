// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The value type shuttled through bindings, exports and endowments.
//!
//! The core is scripting-language-agnostic: source sanitization, scope-proxy
//! construction and `evaluate` itself are delegated to the host. What the
//! core does need is *some* concrete representation to move through
//! notifiers, fixed/live bindings and namespace objects. This is that
//! minimal dynamic value, modeled the way an embedding host would see it
//! from the outside, not the engine's own internal heap representation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::CompartmentError;

/// An opaque value produced or consumed by a confined evaluator.
///
/// Cheaply cloneable (`Rc`-backed where heap allocated), matching the
/// specifier and record types elsewhere in this crate.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Object(Rc<RefCell<BTreeMap<Rc<str>, Value>>>),
    Function(Rc<dyn Fn(&[Value]) -> Result<Value, CompartmentError>>),
}

impl Value {
    pub fn object(entries: impl IntoIterator<Item = (Rc<str>, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn function(
        f: impl Fn(&[Value]) -> Result<Value, CompartmentError> + 'static,
    ) -> Self {
        Value::Function(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, CompartmentError> {
        match self {
            Value::Function(f) => f(args),
            _ => Err(CompartmentError::type_error("value", "a function")),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Identity comparison: two `Object`/`Function` values are the same
    /// value iff they share the same allocation, not merely structurally
    /// equal.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Value {
        match self {
            Value::Object(map) => map.borrow().get(name).cloned().unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(_) => write!(f, "[Function]"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

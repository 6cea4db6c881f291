// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [9.1.1.5 Module Environment Records](https://tc39.es/ecma262/#sec-module-environment-records)
//!
//! Every local name a module's functor declares, whether it ends up
//! exported or not, gets one of these. Fixed bindings are initialized
//! exactly once via `init`; live bindings may be reassigned any number of
//! times via `update`/`set`. Both start in the temporal dead zone: reading
//! or (for live bindings) writing before the first `init`/`update` raises a
//! reference error, matching `let`/`const` TDZ semantics rather than `var`
//! hoisting.

use std::rc::Rc;
use std::cell::RefCell;

use crate::error::CompartmentError;
use crate::value::Value;

type Updater = Rc<dyn Fn(&Value)>;

#[derive(Clone, Copy)]
pub enum BindingKind {
    /// `const`-like: set once via `init`, never reassigned thereafter.
    Fixed,
    /// Reassignable. `set_proxy_trap` mirrors the static record's
    /// `liveExportMap` entry: whether the module's own source is allowed to
    /// reassign this binding (as opposed to a live export whose only writer
    /// is, e.g., a re-exported `export *` forwarding binding).
    Live { set_proxy_trap: bool },
}

struct State {
    tdz: bool,
    value: Value,
    updaters: Vec<Updater>,
}

/// A single local binding: storage, TDZ flag, and the pub/sub fan-out that
/// realizes "live" exports.
pub struct Binding {
    name: Rc<str>,
    kind: BindingKind,
    state: RefCell<State>,
}

impl Binding {
    pub fn new(name: impl Into<Rc<str>>, kind: BindingKind) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            kind,
            state: RefCell::new(State {
                tdz: true,
                value: Value::Undefined,
                updaters: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn is_tdz(&self) -> bool {
        self.state.borrow().tdz
    }

    /// Source-level read (and namespace/export read once activated).
    pub fn get(&self) -> Result<Value, CompartmentError> {
        let state = self.state.borrow();
        if state.tdz {
            Err(CompartmentError::TemporalDeadZone {
                name: self.name.clone(),
            })
        } else {
            Ok(state.value.clone())
        }
    }

    /// Source-level assignment through the module's own scope (the
    /// `setProxyTrap`). Fixed bindings, and live bindings whose trap is
    /// closed, reject assignment with the same error a `const` reassignment
    /// would raise.
    pub fn set(&self, value: Value) -> Result<(), CompartmentError> {
        match self.kind {
            BindingKind::Fixed => Err(CompartmentError::ConstAssignment {
                name: self.name.clone(),
            }),
            BindingKind::Live { set_proxy_trap } => {
                if !set_proxy_trap {
                    return Err(CompartmentError::ConstAssignment {
                        name: self.name.clone(),
                    });
                }
                if self.state.borrow().tdz {
                    return Err(CompartmentError::TemporalDeadZone {
                        name: self.name.clone(),
                    });
                }
                self.publish(value);
                Ok(())
            }
        }
    }

    /// `onceVar`'s initializer for a fixed local name: clears TDZ, stores
    /// the value exactly once (callers are generated code and are trusted
    /// not to call this twice for the same name).
    pub fn init(&self, value: Value) {
        self.publish(value);
    }

    /// `liveVar`'s updater for a live local name: clears TDZ on first call,
    /// reassigns on every subsequent call.
    pub fn update(&self, value: Value) {
        self.publish(value);
    }

    /// Subscribe `updater` to every future value of this binding. If the
    /// binding has already left TDZ, `updater` additionally fires once,
    /// immediately, with the current value.
    pub fn notify(&self, updater: Updater) {
        let mut state = self.state.borrow_mut();
        if !state.tdz {
            updater(&state.value);
        }
        state.updaters.push(updater);
    }

    fn publish(&self, value: Value) {
        let updaters = {
            let mut state = self.state.borrow_mut();
            state.tdz = false;
            state.value = value.clone();
            state.updaters.clone()
        };
        for updater in updaters {
            updater(&value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_before_init_is_a_reference_error() {
        let b = Binding::new("x", BindingKind::Fixed);
        assert!(matches!(
            b.get(),
            Err(CompartmentError::TemporalDeadZone { .. })
        ));
    }

    #[test]
    fn fixed_binding_rejects_reassignment() {
        let b = Binding::new("x", BindingKind::Fixed);
        b.init(Value::from(1.0));
        assert!(matches!(
            b.set(Value::from(2.0)),
            Err(CompartmentError::ConstAssignment { .. })
        ));
    }

    #[test]
    fn live_binding_fans_out_updates_to_subscribers() {
        let b = Binding::new("y", BindingKind::Live { set_proxy_trap: true });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        b.notify(Rc::new(move |v: &Value| seen2.borrow_mut().push(v.as_number())));
        assert_eq!(*seen.borrow(), Vec::<Option<f64>>::new());
        b.update(Value::from(1.0));
        b.set(Value::from(2.0)).unwrap();
        assert_eq!(*seen.borrow(), vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn notify_after_initialization_fires_immediately() {
        let b = Binding::new("z", BindingKind::Fixed);
        b.init(Value::from(9.0));
        let seen = Rc::new(RefCell::new(None));
        let seen2 = seen.clone();
        b.notify(Rc::new(move |v: &Value| *seen2.borrow_mut() = v.as_number()));
        assert_eq!(*seen.borrow(), Some(9.0));
    }
}

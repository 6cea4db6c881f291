// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.6 Module Namespace Exotic Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)
//!
//! A namespace has prototype null, sorted own string keys, and exposes each
//! export through a non-writable, non-configurable *accessor* so that reads
//! stay live against the underlying binding even once the namespace itself
//! is sealed. Before the defining module has finished instantiating, the
//! namespace exists but is not yet readable: see [`DeferredExports`], the
//! handle returned ahead of time so cyclic and cross-compartment imports can
//! wire against it early.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::binding::Binding;
use crate::error::CompartmentError;
use crate::specifier::FullSpecifier;
use crate::value::Value;

type ExportsTable = Rc<RefCell<BTreeMap<Rc<str>, Rc<Binding>>>>;

enum NamespaceState {
    /// Not yet activated: the table may still gain bindings, but nothing is
    /// readable from the outside. Accessing a binding here is the same
    /// reference error an uninitialized module environment binding raises,
    /// so this crate throws rather than returning undefined.
    Pending(ExportsTable),
    /// Sealed: no further keys will be added. Reads still consult live
    /// binding state (a live export continues to reflect reassignment), but
    /// the namespace's own key set is frozen.
    Active(ExportsTable),
}

struct NamespaceInner {
    specifier: FullSpecifier,
    state: RefCell<NamespaceState>,
    /// Backs [`ExportsNamespace::identity_key`]/[`identity_witness`] for the
    /// process-wide alias registry, independent of `NamespaceInner`'s own
    /// layout.
    marker: Rc<()>,
}

/// The public, prototype-less exports namespace handle.
///
/// Cheaply cloneable; all clones observe the same underlying table, which is
/// the identity the alias registry and the diamond-dependency invariant rely
/// on (two importers of the same module see the same namespace object).
#[derive(Clone)]
pub struct ExportsNamespace(Rc<NamespaceInner>);

impl ExportsNamespace {
    pub(crate) fn new(specifier: FullSpecifier, table: ExportsTable) -> Self {
        Self(Rc::new(NamespaceInner {
            specifier,
            state: RefCell::new(NamespaceState::Pending(table)),
            marker: Rc::new(()),
        }))
    }

    pub fn specifier(&self) -> &FullSpecifier {
        &self.0.specifier
    }

    pub(crate) fn table(&self) -> ExportsTable {
        match &*self.0.state.borrow() {
            NamespaceState::Pending(t) | NamespaceState::Active(t) => t.clone(),
        }
    }

    /// Seals the namespace. Idempotent.
    pub(crate) fn activate(&self) {
        let mut state = self.0.state.borrow_mut();
        if let NamespaceState::Pending(table) = &*state {
            *state = NamespaceState::Active(table.clone());
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(&*self.0.state.borrow(), NamespaceState::Active(_))
    }

    /// `namespace.<name>` read.
    pub fn get(&self, name: &str) -> Result<Value, CompartmentError> {
        match &*self.0.state.borrow() {
            NamespaceState::Pending(_) => Err(CompartmentError::TemporalDeadZone {
                name: Rc::from(name),
            }),
            NamespaceState::Active(table) => match table.borrow().get(name) {
                Some(binding) => binding.get(),
                None => Ok(Value::Undefined),
            },
        }
    }

    /// ### [10.4.6.11 \[\[OwnPropertyKeys\]\] ( )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-ownpropertykeys)
    pub fn own_keys(&self) -> Result<Vec<Rc<str>>, CompartmentError> {
        match &*self.0.state.borrow() {
            NamespaceState::Pending(_) => Err(CompartmentError::TemporalDeadZone {
                name: Rc::from("*namespace*"),
            }),
            NamespaceState::Active(table) => Ok(table.borrow().keys().cloned().collect()),
        }
    }

    /// ### [10.4.6.9 \[\[Set\]\] ( P, V, Receiver )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-set-p-v-receiver)
    ///
    /// Any attempt to write, define, or delete a property on a namespace
    /// fails, pending or active alike.
    pub fn set(&self, _name: &str, _value: Value) -> Result<(), CompartmentError> {
        Err(CompartmentError::FrozenNamespace {
            specifier: self.0.specifier.clone(),
        })
    }

    /// ### [10.4.6.4 \[\[PreventExtensions\]\] ( )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-preventextensions)
    ///
    /// Always truthfully idempotent, since a namespace is never extensible
    /// from the outside.
    pub fn prevent_extensions(&self) -> bool {
        true
    }

    pub(crate) fn identity_key(&self) -> usize {
        Rc::as_ptr(&self.0.marker) as *const () as usize
    }

    pub(crate) fn identity_witness(&self) -> std::rc::Weak<()> {
        Rc::downgrade(&self.0.marker)
    }
}

/// The namespace handle and its backing table, returned before the module
/// that owns them has finished loading or executing, plus the callback that
/// seals the namespace once it has.
#[derive(Clone)]
pub struct DeferredExports {
    pub namespace: ExportsNamespace,
    table: ExportsTable,
}

impl DeferredExports {
    pub(crate) fn new(specifier: FullSpecifier) -> Self {
        let table: ExportsTable = Rc::new(RefCell::new(BTreeMap::new()));
        Self {
            namespace: ExportsNamespace::new(specifier, table.clone()),
            table,
        }
    }

    /// The mutable table instance construction fills in before activation.
    pub(crate) fn proxied_exports(&self) -> ExportsTable {
        self.table.clone()
    }

    pub fn activate(&self) {
        self.namespace.activate();
    }
}

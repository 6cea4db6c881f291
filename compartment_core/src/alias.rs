// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process-wide alias registry.
//!
//! A module-map entry is a namespace proxy obtained from *some*
//! compartment's `module()`/`import()` call. When that proxy is later
//! handed to a *different* compartment's `moduleMap`, the loader needs to
//! recognize it as "module X of compartment Y" rather than as opaque data.
//! Host engines typically do this with a process-wide `WeakMap` keyed by
//! proxy identity; this crate's cooperative single-thread model makes a
//! thread-local weak table the direct equivalent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::compartment::Compartment;
use crate::namespace::ExportsNamespace;
use crate::specifier::FullSpecifier;

/// A reference to a module defined in a *different* compartment.
///
/// Aliases never execute on their own: they resolve to whichever instance
/// exists (or comes to exist) in the target compartment.
#[derive(Clone)]
pub struct Alias {
    pub compartment: Compartment,
    pub specifier: FullSpecifier,
}

/// Thread-local (this crate's process) registry from namespace-proxy
/// identity to the alias it represents.
#[derive(Clone, Default)]
pub struct AliasRegistry {
    entries: Rc<RefCell<HashMap<usize, (Weak<()>, Alias)>>>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, namespace: &ExportsNamespace, alias: Alias) {
        let key = namespace.identity_key();
        self.entries
            .borrow_mut()
            .insert(key, (namespace.identity_witness(), alias));
    }

    /// Returns the alias a namespace proxy was registered under, if this
    /// registry has seen it and the proxy is still alive.
    pub fn lookup(&self, namespace: &ExportsNamespace) -> Option<Alias> {
        let key = namespace.identity_key();
        let mut entries = self.entries.borrow_mut();
        match entries.get(&key) {
            Some((witness, alias)) if witness.upgrade().is_some() => Some(alias.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }
}

thread_local! {
    /// The "process-wide" registry. This crate's cooperative single-thread
    /// contract makes a thread-local the direct equivalent of a host
    /// engine's process-wide `WeakMap`.
    static GLOBAL_ALIAS_REGISTRY: AliasRegistry = AliasRegistry::new();
}

/// The registry every [`crate::compartment::Compartment`] registers its
/// deferred-exports namespaces into, and consults when validating a
/// `moduleMap` entry.
pub fn global_registry() -> AliasRegistry {
    GLOBAL_ALIAS_REGISTRY.with(|registry| registry.clone())
}

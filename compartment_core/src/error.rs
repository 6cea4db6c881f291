// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The error taxonomy: argument type errors, resolution errors, record
//! validation errors, linkage errors, TDZ errors and sticky user errors from
//! module bodies.

use std::rc::Rc;

use crate::specifier::FullSpecifier;
use crate::value::Value;

/// Every error the core can surface at a public boundary.
///
/// Cloneable so that a module instance can cache a thrown error and rethrow
/// the *same* error on every subsequent `execute()` call (sticky failure),
/// and so that the loader can cache a rejected discovery promise and hand
/// it back to every later `load()` of the same specifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompartmentError {
    /// Invalid specifier type, invalid module-map entry, invalid lexical
    /// names: raised synchronously from public API, never from the loader
    /// or linker.
    #[error("{what} must be {expected}")]
    TypeError { what: Rc<str>, expected: Rc<str> },

    /// A `moduleMap` entry, or a module-map hook result, was not an
    /// exports-namespace proxy this process recognizes.
    #[error("module map entry for {specifier:?} is not a recognized exports namespace")]
    UnrecognizedAlias { specifier: Rc<str> },

    /// `resolveHook` raised, or produced a specifier the loader could not
    /// use.
    #[error("could not resolve {import_specifier:?} imported by {referrer}: {message}")]
    ResolutionFailed {
        import_specifier: Rc<str>,
        referrer: FullSpecifier,
        message: Rc<str>,
    },

    /// `importHook` rejected.
    #[error("could not import {specifier}: {message}")]
    ImportFailed {
        specifier: FullSpecifier,
        message: Rc<str>,
    },

    /// A static module record failed shape validation: non-string
    /// `exports`, unknown binding names, overlapping fixed/live export
    /// names.
    #[error("malformed static module record for {specifier}: {message}")]
    MalformedRecord {
        specifier: FullSpecifier,
        message: Rc<str>,
    },

    /// `link`/`importNow` was called for a specifier `load` never reached.
    #[error("module {specifier} has not been loaded in this compartment")]
    NotLoaded { specifier: FullSpecifier },

    /// A satisfied dependency does not provide a name this module imports.
    /// Raised synchronously from `execute()`.
    #[error("module {specifier} does not provide an export named {export_name}")]
    MissingExport {
        specifier: FullSpecifier,
        export_name: Rc<str>,
    },

    /// Access to a binding that has not yet been initialized.
    #[error("Cannot access '{name}' before initialization")]
    TemporalDeadZone { name: Rc<str> },

    /// Write to a fixed (`const`-like) binding, or a live binding whose
    /// `setProxyTrap` forbids it.
    #[error("Assignment to constant binding '{name}'")]
    ConstAssignment { name: Rc<str> },

    /// Mutation of a namespace proxy, or of a deferred-exports proxy before
    /// `activate()`.
    #[error("Cannot modify namespace object of {specifier}")]
    FrozenNamespace { specifier: FullSpecifier },

    /// A module instance's functor threw. Cached on the instance and
    /// rethrown verbatim on every subsequent `execute()`.
    #[error("{specifier}: module body threw an error")]
    UserThrown {
        specifier: FullSpecifier,
        value: Value,
    },
}

impl CompartmentError {
    pub fn type_error(what: impl Into<Rc<str>>, expected: impl Into<Rc<str>>) -> Self {
        Self::TypeError {
            what: what.into(),
            expected: expected.into(),
        }
    }
}

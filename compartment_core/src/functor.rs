// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The delegated `evaluate` operation and the shape of a parsed module's
//! execution functor.
//!
//! Source sanitization and scope-proxy construction are out of scope: this
//! crate never parses source text. What it needs from a host is a way to
//! turn a parsed module's functor source into a callable functor, with
//! `onceVar`/`liveVar` wired against the module's bindings. A test or
//! embedding host that has no real parser can implement [`Evaluator`] by
//! looking the source up in a table of hand-built functors, which is
//! exactly how the integration tests in this crate exercise the loader and
//! linker.

use std::collections::HashMap;
use std::rc::Rc;

use crate::binding::Binding;
use crate::error::CompartmentError;
use crate::value::Value;

/// The functor source text a compartment's evaluator turns into a callable
/// [`ModuleFunctor`]. Opaque to the core beyond being a lookup key / source
/// string handed to `evaluate`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FunctorSource(pub Rc<str>);

impl From<&str> for FunctorSource {
    fn from(value: &str) -> Self {
        Self(Rc::from(value))
    }
}

/// Per-local-name fixed initializers, handed to the functor as `onceVar`.
pub type OnceVarTable = HashMap<Rc<str>, Rc<Binding>>;
/// Per-local-name live updaters, handed to the functor as `liveVar`.
pub type LiveVarTable = HashMap<Rc<str>, Rc<Binding>>;

/// `updateRecord`: for each import specifier, the updaters registered
/// against each name imported from it.
pub type UpdateRecord = HashMap<Rc<str>, HashMap<Rc<str>, Vec<Rc<dyn Fn(&Value)>>>>;

/// Arguments passed to a parsed module's functor: `{ imports, onceVar,
/// liveVar }`.
pub struct FunctorContext<'a> {
    /// Calls back into the module instance's import-wiring logic exactly
    /// once. Must be invoked before the functor returns if the module
    /// declares any imports or re-exports.
    pub imports: &'a dyn Fn(UpdateRecord) -> Result<(), CompartmentError>,
    pub once_var: &'a OnceVarTable,
    pub live_var: &'a LiveVarTable,
}

/// A parsed module's execution functor.
pub trait ModuleFunctor {
    fn call(&self, ctx: FunctorContext<'_>) -> Result<(), CompartmentError>;
}

impl<F> ModuleFunctor for F
where
    F: Fn(FunctorContext<'_>) -> Result<(), CompartmentError>,
{
    fn call(&self, ctx: FunctorContext<'_>) -> Result<(), CompartmentError> {
        (self)(ctx)
    }
}

/// `{ __moduleShimLexicals__, transforms }`, the special option the
/// compartment's evaluate honors by extending its scope proxy with the
/// module's live-binding accessors. Carried through for hosts with a real
/// scope-proxy evaluator; unused by this crate's own TDZ/notifier
/// bookkeeping, which happens entirely through `onceVar`/`liveVar`.
#[derive(Clone, Default)]
pub struct EvaluateOptions {
    pub module_shim_lexicals: Vec<Rc<str>>,
    pub transforms: Vec<Rc<str>>,
}

/// The delegated `evaluate(source, options) -> value` operation, specialized
/// to functor production for module bodies.
pub trait Evaluator {
    fn evaluate_module(
        &self,
        source: &FunctorSource,
        options: &EvaluateOptions,
    ) -> Result<Rc<dyn ModuleFunctor>, CompartmentError>;

    /// The general-purpose form of `evaluate`, for a compartment's
    /// non-module script surface. Most hosts exercised by this crate only
    /// ever call `evaluate_module`; the default rejects so a host that
    /// truly has no script evaluator doesn't have to implement a stub.
    fn evaluate_script(
        &self,
        _source: &str,
        _globals: &HashMap<Rc<str>, Value>,
    ) -> Result<Value, CompartmentError> {
        Err(CompartmentError::type_error(
            "evaluate",
            "an evaluator that implements evaluate_script",
        ))
    }
}

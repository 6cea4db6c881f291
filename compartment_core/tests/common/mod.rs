// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared scaffolding for the integration tests in this directory: a
//! pass-through resolve hook, a table-backed import hook, and an evaluator
//! that looks execution functors up by `FunctorSource` text rather than
//! parsing anything. None of these are meant to resemble a real host; they
//! exist to drive the loader/linker/instance machinery with hand-built
//! functors, the way the crate's own `#[cfg(test)]` modules drive individual
//! pieces in isolation.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use compartment_core::{
    CompartmentError, EvaluateOptions, Evaluator, FullSpecifier, FunctorSource, ImportHook,
    ImportHookResult, ModuleFunctor, ResolveHook, StaticModuleRecord,
};

/// `resolve` is the identity on the import specifier: every test in this
/// directory names its modules with full specifiers directly, so there is
/// no relative-path joining to do.
pub struct IdentityResolveHook;

impl ResolveHook for IdentityResolveHook {
    fn resolve(
        &self,
        import_specifier: &str,
        _referrer_full_specifier: &FullSpecifier,
    ) -> Result<FullSpecifier, CompartmentError> {
        Ok(FullSpecifier::from(import_specifier))
    }
}

/// An import hook backed by a fixed table of records, handed out as plain
/// (non-aliased) results.
pub struct TableImportHook {
    records: HashMap<FullSpecifier, Rc<StaticModuleRecord>>,
}

impl TableImportHook {
    pub fn new(records: HashMap<FullSpecifier, Rc<StaticModuleRecord>>) -> Self {
        Self { records }
    }
}

impl ImportHook for TableImportHook {
    fn import(
        &self,
        full_specifier: &FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>> {
        let result = self
            .records
            .get(full_specifier)
            .cloned()
            .ok_or_else(|| CompartmentError::ImportFailed {
                specifier: full_specifier.clone(),
                message: Rc::from("no record registered for this specifier"),
            });
        async move { result.map(ImportHookResult::Record) }.boxed_local()
    }
}

/// An evaluator that looks a pre-registered functor up by the exact
/// `FunctorSource` text a `ParsedModuleRecord` carries, and (separately)
/// echoes a named entry out of `evaluate_script`'s globals: just enough to
/// exercise endowment isolation at the compartment boundary without a real
/// script evaluator.
#[derive(Default)]
pub struct TableEvaluator {
    functors: RefCell<HashMap<Rc<str>, Rc<dyn ModuleFunctor>>>,
}

impl TableEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &str, functor: Rc<dyn ModuleFunctor>) {
        self.functors.borrow_mut().insert(Rc::from(key), functor);
    }
}

impl Evaluator for TableEvaluator {
    fn evaluate_module(
        &self,
        source: &FunctorSource,
        _options: &EvaluateOptions,
    ) -> Result<Rc<dyn ModuleFunctor>, CompartmentError> {
        self.functors
            .borrow()
            .get(source.0.as_ref())
            .cloned()
            .ok_or_else(|| {
                CompartmentError::type_error(
                    "functor source",
                    format!("a functor registered under {:?}", source.0),
                )
            })
    }

    fn evaluate_script(
        &self,
        source: &str,
        globals: &HashMap<Rc<str>, compartment_core::Value>,
    ) -> Result<compartment_core::Value, CompartmentError> {
        globals.get(source).cloned().ok_or_else(|| {
            CompartmentError::type_error("evaluate", format!("{source:?} to be a visible global"))
        })
    }
}

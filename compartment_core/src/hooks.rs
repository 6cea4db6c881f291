// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host-supplied hooks: the import hook and the module-map hook. (The
//! resolve hook lives in [`crate::specifier`], next to the
//! [`crate::specifier::FullSpecifier`] it produces.)

use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::alias::Alias;
use crate::error::CompartmentError;
use crate::record::StaticModuleRecord;
use crate::specifier::FullSpecifier;

/// `import(fullSpecifier) -> Promise<StaticModuleRecord | { record, specifier
/// }>`. The second form triggers aliasing: the record is associated with a
/// canonical specifier distinct from the one requested, supporting
/// index/extension redirects.
pub enum ImportHookResult {
    Record(Rc<StaticModuleRecord>),
    Aliased {
        record: Rc<StaticModuleRecord>,
        specifier: FullSpecifier,
    },
}

/// Host-supplied, per compartment, possibly asynchronous.
pub trait ImportHook {
    fn import(
        &self,
        full_specifier: &FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>>;
}

impl<F> ImportHook for F
where
    F: Fn(&FullSpecifier) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>>,
{
    fn import(
        &self,
        full_specifier: &FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>> {
        (self)(full_specifier)
    }
}

/// Optional host-supplied function mapping a full specifier to a foreign
/// compartment's deferred export namespace *before* the import hook is
/// consulted.
pub trait ModuleMapHook {
    fn resolve(&self, full_specifier: &FullSpecifier) -> Option<Alias>;
}

impl<F> ModuleMapHook for F
where
    F: Fn(&FullSpecifier) -> Option<Alias>,
{
    fn resolve(&self, full_specifier: &FullSpecifier) -> Option<Alias> {
        (self)(full_specifier)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full specifiers and the host-supplied resolve hook.
//!
//! A [`FullSpecifier`] is opaque to the core: two full specifiers name the
//! same module-in-compartment iff their strings compare equal. Everything
//! else (how a specifier is derived from a referrer, whether it looks like a
//! path or a URL) is the host's business.

use std::fmt;
use std::rc::Rc;

/// Canonical, resolved identifier of a module within a single compartment.
///
/// Cheaply cloneable: internally an `Rc<str>` so that the loader, linker and
/// every table keyed by specifier can share the same allocation instead of
/// re-copying strings at each hop of the module graph.
#[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FullSpecifier(Rc<str>);

impl FullSpecifier {
    pub fn new(value: impl Into<Rc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FullSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FullSpecifier({:?})", self.0)
    }
}

impl fmt::Display for FullSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FullSpecifier {
    fn from(value: &str) -> Self {
        Self(Rc::from(value))
    }
}

impl From<String> for FullSpecifier {
    fn from(value: String) -> Self {
        Self(Rc::from(value))
    }
}

impl std::borrow::Borrow<str> for FullSpecifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// `resolve(importSpecifier, referrerFullSpecifier) -> fullSpecifier`.
///
/// Pure and deterministic per compartment: the same pair of arguments must
/// always resolve to the same full specifier, since `ModuleRecord` caches
/// `resolvedImports` once and never calls the hook again for it.
pub trait ResolveHook {
    fn resolve(
        &self,
        import_specifier: &str,
        referrer_full_specifier: &FullSpecifier,
    ) -> Result<FullSpecifier, crate::error::CompartmentError>;
}

impl<F> ResolveHook for F
where
    F: Fn(&str, &FullSpecifier) -> Result<FullSpecifier, crate::error::CompartmentError>,
{
    fn resolve(
        &self,
        import_specifier: &str,
        referrer_full_specifier: &FullSpecifier,
    ) -> Result<FullSpecifier, crate::error::CompartmentError> {
        (self)(import_specifier, referrer_full_specifier)
    }
}

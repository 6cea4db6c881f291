// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.5 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records)
//!
//! Static module records and per-compartment module records.

use std::collections::HashMap;
use std::rc::Rc;

use crate::alias::Alias;
use crate::compartment::Compartment;
use crate::error::CompartmentError;
use crate::functor::FunctorSource;
use crate::specifier::FullSpecifier;

/// A `liveExportMap` entry: which local name backs the export, and whether
/// source inside the module may reassign it.
#[derive(Clone)]
pub struct LiveExportDescriptor {
    pub local_name: Rc<str>,
    pub set_proxy_trap: bool,
}

/// The two record flavors, unified as a tagged variant rather than trait
/// objects since both need the same uniform construction protocol from the
/// linker.
pub enum StaticModuleRecord {
    Parsed(Rc<ParsedModuleRecord>),
    ThirdParty(Rc<ThirdPartyModuleRecord>),
}

/// ### [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)
///
/// A record produced by parsing module source.
pub struct ParsedModuleRecord {
    /// Import specifiers as written in source, in source order.
    pub imports: Vec<Rc<str>>,
    /// Exported name -> local binding name, for `const`-like exports.
    pub fixed_export_map: HashMap<Rc<str>, Rc<str>>,
    /// Exported name -> descriptor, for reassignable exports.
    pub live_export_map: HashMap<Rc<str>, LiveExportDescriptor>,
    /// `export *` sources, in source order.
    pub reexports: Vec<Rc<str>>,
    /// The functor source handed to `compartment.evaluate` once per
    /// instance.
    pub functor_source: FunctorSource,
}

/// A record supplied directly by the host rather than parsed: synthetic
/// modules, or natively-implemented built-ins.
pub struct ThirdPartyModuleRecord {
    /// Import specifiers as written (`imports` applies to both record
    /// flavors; only `exports` is third-party-only).
    pub imports: Vec<Rc<str>>,
    pub exports: Vec<Rc<str>>,
    pub execute: Rc<dyn ThirdPartyExecute>,
}

/// `execute(proxiedExports, compartment, resolvedImports)` for a third-party
/// record.
pub trait ThirdPartyExecute {
    fn execute(
        &self,
        proxied_exports: &crate::instance::ThirdPartyExports,
        compartment: &Compartment,
        resolved_imports: &HashMap<Rc<str>, FullSpecifier>,
    ) -> Result<(), CompartmentError>;
}

use crate::ident::is_valid_identifier;

impl StaticModuleRecord {
    pub fn parsed(record: ParsedModuleRecord) -> Result<Rc<Self>, CompartmentError> {
        for name in record
            .fixed_export_map
            .keys()
            .chain(record.live_export_map.keys())
        {
            if !is_valid_identifier(name) && name.as_ref() != "default" {
                return Err(CompartmentError::MalformedRecord {
                    specifier: FullSpecifier::from("<static record>"),
                    message: Rc::from(format!("export name {name:?} is not a valid identifier")),
                });
            }
        }
        for name in record.fixed_export_map.keys() {
            if record.live_export_map.contains_key(name) {
                return Err(CompartmentError::MalformedRecord {
                    specifier: FullSpecifier::from("<static record>"),
                    message: Rc::from(format!(
                        "{name:?} is listed as both a fixed and a live export"
                    )),
                });
            }
        }
        for descriptor in record.live_export_map.values() {
            if !is_valid_identifier(&descriptor.local_name) {
                return Err(CompartmentError::MalformedRecord {
                    specifier: FullSpecifier::from("<static record>"),
                    message: Rc::from(format!(
                        "local name {:?} is not a valid identifier",
                        descriptor.local_name
                    )),
                });
            }
        }
        for local_name in record.fixed_export_map.values() {
            if !is_valid_identifier(local_name) {
                return Err(CompartmentError::MalformedRecord {
                    specifier: FullSpecifier::from("<static record>"),
                    message: Rc::from(format!(
                        "local name {local_name:?} is not a valid identifier"
                    )),
                });
            }
        }
        Ok(Rc::new(StaticModuleRecord::Parsed(Rc::new(record))))
    }

    pub fn third_party(record: ThirdPartyModuleRecord) -> Result<Rc<Self>, CompartmentError> {
        for name in &record.exports {
            if !is_valid_identifier(name) && name.as_ref() != "default" {
                return Err(CompartmentError::MalformedRecord {
                    specifier: FullSpecifier::from("<static record>"),
                    message: Rc::from(format!("export name {name:?} is not a valid identifier")),
                });
            }
        }
        Ok(Rc::new(StaticModuleRecord::ThirdParty(Rc::new(record))))
    }

    /// Import specifiers as written in source, present on both record
    /// flavors.
    pub fn imports(&self) -> &[Rc<str>] {
        match self {
            StaticModuleRecord::Parsed(p) => &p.imports,
            StaticModuleRecord::ThirdParty(p) => &p.imports,
        }
    }

    /// `imports` unioned with `export *` sources, deduplicated and order
    /// preserved: the set the loader must transitively discover and the
    /// linker must build instances for, since a reexport source that names
    /// no local binding is still a dependency the graph must include.
    pub fn effective_import_specifiers(&self) -> Vec<Rc<str>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for specifier in self.imports().iter().chain(self.reexports().iter()) {
            if seen.insert(specifier.clone()) {
                out.push(specifier.clone());
            }
        }
        out
    }

    pub fn reexports(&self) -> &[Rc<str>] {
        match self {
            StaticModuleRecord::Parsed(p) => &p.reexports,
            StaticModuleRecord::ThirdParty(_) => &[],
        }
    }
}

/// A module's identity within one compartment.
///
/// Represented as a tagged variant rather than a `compartment` backref plus
/// optional alias fields: an [`Alias`] record never owns a static record of
/// its own, it only names where to delegate.
pub enum ModuleRecord {
    Local {
        specifier: FullSpecifier,
        static_record: Rc<StaticModuleRecord>,
        resolved_imports: HashMap<Rc<str>, FullSpecifier>,
    },
    Delegated {
        specifier: FullSpecifier,
        target: Alias,
    },
}

impl ModuleRecord {
    pub fn specifier(&self) -> &FullSpecifier {
        match self {
            ModuleRecord::Local { specifier, .. } => specifier,
            ModuleRecord::Delegated { specifier, .. } => specifier,
        }
    }
}

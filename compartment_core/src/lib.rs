// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Confined execution compartments: an isolated global namespace and module
//! graph per compartment, module source acquired through host hooks, linked
//! across compartment boundaries by name, executed with live-binding
//! semantics.
//!
//! Out of scope: source sanitization and scope-proxy construction (the
//! confined evaluator is an opaque [`Evaluator`]), primordial taming,
//! `node_modules`-style package resolution, and a CLI (see the sibling
//! `compartment_cli` crate for a minimal host).

mod alias;
mod binding;
mod compartment;
mod error;
mod functor;
mod hooks;
mod ident;
mod instance;
mod linker;
mod loader;
mod namespace;
mod record;
mod specifier;
mod value;

pub use alias::{Alias, AliasRegistry};
pub use compartment::{Compartment, CompartmentOptions};
pub use error::CompartmentError;
pub use functor::{EvaluateOptions, Evaluator, FunctorContext, FunctorSource, ModuleFunctor, UpdateRecord};
pub use hooks::{ImportHook, ImportHookResult, ModuleMapHook};
pub use instance::{ModuleInstance, ThirdPartyExports};
pub use namespace::{DeferredExports, ExportsNamespace};
pub use record::{
    LiveExportDescriptor, ModuleRecord, ParsedModuleRecord, StaticModuleRecord,
    ThirdPartyExecute, ThirdPartyModuleRecord,
};
pub use specifier::{FullSpecifier, ResolveHook};
pub use value::Value;

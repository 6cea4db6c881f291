// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.6.1.2 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
//!
//! A synchronous walk, corresponding to [16.2.1.6.1.2.1 InnerModuleLinking](https://tc39.es/ecma262/#sec-InnerModuleLinking),
//! that instantiates every reachable `ModuleRecord` into a `ModuleInstance`
//! without executing any of them.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::compartment::Compartment;
use crate::error::CompartmentError;
use crate::instance::ModuleInstance;
use crate::record::{ModuleRecord, StaticModuleRecord};
use crate::specifier::FullSpecifier;

/// Requires that `load` already reached `specifier` in `compartment`
/// ([`CompartmentError::NotLoaded`] otherwise). Cycle-tolerant: a parsed
/// instance's shell is cached before this function recurses into its
/// imports, so a dependency cycle finds the partially-wired instance already
/// in the cache rather than recursing forever.
pub(crate) fn link(
    compartment: &Compartment,
    specifier: &FullSpecifier,
) -> Result<Rc<ModuleInstance>, CompartmentError> {
    if let Some(instance) = compartment.cached_instance(specifier) {
        return Ok(instance);
    }

    let record = compartment.module_record(specifier)?;
    match &*record {
        ModuleRecord::Delegated { target, .. } => {
            trace!(specifier = %specifier, target = target.specifier.as_str(), "link: delegating to alias");
            let instance = link(&target.compartment, &target.specifier)?;
            compartment.cache_instance(specifier.clone(), instance.clone());
            Ok(instance)
        }
        ModuleRecord::Local {
            static_record,
            resolved_imports,
            ..
        } => match &**static_record {
            StaticModuleRecord::Parsed(parsed) => {
                trace!(specifier = %specifier, "link: building parsed instance shell");
                let deferred = compartment.deferred_exports(specifier);
                let shell = ModuleInstance::build_parsed_shell(
                    specifier.clone(),
                    parsed.clone(),
                    compartment.evaluator().as_ref(),
                    deferred,
                )?;
                shell.set_owning_compartment(compartment.clone());
                // Cache before recursing: a dependency cycle back to
                // `specifier` must observe this shell, not trigger another
                // `build_parsed_shell` call.
                compartment.cache_instance(specifier.clone(), shell.clone());

                let mut imported = HashMap::with_capacity(resolved_imports.len());
                for (import_specifier, full) in resolved_imports {
                    let dependency = link(compartment, full)?;
                    imported.insert(import_specifier.clone(), dependency);
                }
                shell.set_imported(imported);
                Ok(shell)
            }
            StaticModuleRecord::ThirdParty(third_party) => {
                trace!(specifier = %specifier, "link: building third-party instance");
                let deferred = compartment.deferred_exports(specifier);
                let instance = ModuleInstance::build_third_party(
                    specifier.clone(),
                    third_party.clone(),
                    resolved_imports.clone(),
                    deferred,
                )?;
                instance.set_owning_compartment(compartment.clone());
                compartment.cache_instance(specifier.clone(), instance.clone());
                Ok(instance)
            }
        },
    }
}

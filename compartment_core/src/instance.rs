// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module instances: the per-compartment, per-full-specifier executable
//! realization of a static record.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::binding::{Binding, BindingKind};
use crate::compartment::Compartment;
use crate::error::CompartmentError;
use crate::functor::{
    EvaluateOptions, Evaluator, FunctorContext, LiveVarTable, ModuleFunctor, OnceVarTable,
    UpdateRecord,
};
use crate::namespace::{DeferredExports, ExportsNamespace};
use crate::record::{ParsedModuleRecord, ThirdPartyModuleRecord};
use crate::specifier::FullSpecifier;
use crate::value::Value;

type ExportsTable = Rc<RefCell<BTreeMap<Rc<str>, Rc<Binding>>>>;

#[derive(Clone)]
enum ExecuteState {
    NotStarted,
    Running,
    Done,
    Failed(CompartmentError),
}

enum Body {
    Parsed {
        record: Rc<ParsedModuleRecord>,
        /// Filled in by the linker after this instance's shell is cached:
        /// construction must not require the dependency instances to exist
        /// yet, only their handles, so a cyclic `link` can hand back this
        /// very shell as one of its own dependencies before it is done
        /// recursing.
        imported: RefCell<HashMap<Rc<str>, Rc<ModuleInstance>>>,
        once_var: OnceVarTable,
        live_var: LiveVarTable,
        functor: RefCell<Option<Rc<dyn ModuleFunctor>>>,
    },
    ThirdParty {
        record: Rc<ThirdPartyModuleRecord>,
        resolved_imports: HashMap<Rc<str>, FullSpecifier>,
    },
}

/// The executable realization of a record in one compartment.
pub struct ModuleInstance {
    specifier: FullSpecifier,
    deferred: DeferredExports,
    notifiers: ExportsTable,
    body: Body,
    state: RefCell<ExecuteState>,
    /// Set once by the compartment that links this instance, so that a
    /// third-party record's `execute` can be handed `compartment` without
    /// the instance owning a strong cycle back to its compartment.
    owning_compartment: OnceCell<Compartment>,
}

/// The mutable-until-sealed export table a third-party record's `execute`
/// writes through.
pub struct ThirdPartyExports {
    specifier: FullSpecifier,
    table: ExportsTable,
}

impl ThirdPartyExports {
    pub fn get(&self, name: &str) -> Result<Value, CompartmentError> {
        match self.table.borrow().get(name) {
            Some(binding) => binding.get(),
            None => Err(CompartmentError::MissingExport {
                specifier: self.specifier.clone(),
                export_name: Rc::from(name),
            }),
        }
    }

    pub fn set(&self, name: &str, value: Value) -> Result<(), CompartmentError> {
        match self.table.borrow().get(name) {
            Some(binding) => {
                binding.update(value);
                Ok(())
            }
            None => Err(CompartmentError::MissingExport {
                specifier: self.specifier.clone(),
                export_name: Rc::from(name),
            }),
        }
    }
}

impl ModuleInstance {
    pub fn specifier(&self) -> &FullSpecifier {
        &self.specifier
    }

    pub fn namespace(&self) -> &ExportsNamespace {
        &self.deferred.namespace
    }

    /// Looks up this instance's own export notifier by name: how an
    /// importer (or a re-exporting instance forwarding through it) attaches
    /// to live updates.
    pub fn notifier(&self, export_name: &str) -> Option<Rc<Binding>> {
        self.notifiers.borrow().get(export_name).cloned()
    }

    pub fn export_names(&self) -> Vec<Rc<str>> {
        self.notifiers.borrow().keys().cloned().collect()
    }

    /// Builds a module instance shell for a parsed record: the
    /// binding/notifier tables and the functor are ready, but the
    /// import-instance map is empty until [`Self::set_imported`] is called
    /// once the linker has finished recursing into dependencies.
    ///
    /// `deferred` is the compartment's own deferred-exports entry for this
    /// specifier: the same handle must come back from every call, so the
    /// instance reuses it rather than minting a fresh one.
    pub fn build_parsed_shell(
        specifier: FullSpecifier,
        record: Rc<ParsedModuleRecord>,
        evaluator: &dyn Evaluator,
        deferred: DeferredExports,
    ) -> Result<Rc<Self>, CompartmentError> {
        let notifiers = deferred.proxied_exports();

        let mut locals: HashMap<Rc<str>, Rc<Binding>> = HashMap::new();
        let mut once_var: OnceVarTable = HashMap::new();
        let mut live_var: LiveVarTable = HashMap::new();

        for (export_name, local_name) in &record.fixed_export_map {
            let binding = locals
                .entry(local_name.clone())
                .or_insert_with(|| Binding::new(local_name.clone(), BindingKind::Fixed))
                .clone();
            once_var.insert(local_name.clone(), binding.clone());
            notifiers.borrow_mut().insert(export_name.clone(), binding);
        }
        for (export_name, descriptor) in &record.live_export_map {
            let binding = locals
                .entry(descriptor.local_name.clone())
                .or_insert_with(|| {
                    Binding::new(
                        descriptor.local_name.clone(),
                        BindingKind::Live {
                            set_proxy_trap: descriptor.set_proxy_trap,
                        },
                    )
                })
                .clone();
            live_var.insert(descriptor.local_name.clone(), binding.clone());
            notifiers.borrow_mut().insert(export_name.clone(), binding);
        }

        let options = EvaluateOptions {
            module_shim_lexicals: live_var.keys().cloned().collect(),
            transforms: Vec::new(),
        };
        let functor = evaluator.evaluate_module(&record.functor_source, &options)?;

        Ok(Rc::new(Self {
            specifier,
            deferred,
            notifiers,
            body: Body::Parsed {
                record,
                imported: RefCell::new(HashMap::new()),
                once_var,
                live_var,
                functor: RefCell::new(Some(functor)),
            },
            state: RefCell::new(ExecuteState::NotStarted),
            owning_compartment: OnceCell::new(),
        }))
    }

    /// Populates the import-instance map a parsed instance's functor wires
    /// against. A no-op on a third-party instance, which resolves its
    /// imports itself through `resolvedImports` at execute time rather than
    /// through linker-supplied handles.
    pub(crate) fn set_imported(&self, imported: HashMap<Rc<str>, Rc<ModuleInstance>>) {
        if let Body::Parsed {
            imported: slot, ..
        } = &self.body
        {
            *slot.borrow_mut() = imported;
        }
    }

    /// Builds a module instance for a third-party record. Third-party
    /// records name their dependencies only by full specifier, resolved
    /// through the owning compartment at execute time, so (unlike
    /// [`Self::build_parsed_shell`]) this is a single-phase, fully-formed
    /// construction.
    pub fn build_third_party(
        specifier: FullSpecifier,
        record: Rc<ThirdPartyModuleRecord>,
        resolved_imports: HashMap<Rc<str>, FullSpecifier>,
        deferred: DeferredExports,
    ) -> Result<Rc<Self>, CompartmentError> {
        let notifiers = deferred.proxied_exports();
        for name in &record.exports {
            let binding = Binding::new(
                name.clone(),
                BindingKind::Live {
                    set_proxy_trap: true,
                },
            );
            notifiers.borrow_mut().insert(name.clone(), binding);
        }
        Ok(Rc::new(Self {
            specifier,
            deferred,
            notifiers,
            body: Body::ThirdParty {
                record,
                resolved_imports,
            },
            state: RefCell::new(ExecuteState::NotStarted),
            owning_compartment: OnceCell::new(),
        }))
    }

    pub(crate) fn set_owning_compartment(&self, compartment: Compartment) {
        // Idempotent: the linker may (harmlessly) call this again when a
        // cached instance is returned from a repeat `link`.
        let _ = self.owning_compartment.set(compartment);
    }

    /// Runs the functor at most once. Cycle-tolerant: re-entry while
    /// `Running` is a no-op, since the functor has already consumed its
    /// imports and any value not yet initialized is guarded by TDZ, not by
    /// `execute` itself.
    pub fn execute(&self) -> Result<(), CompartmentError> {
        match &*self.state.borrow() {
            ExecuteState::Done => return Ok(()),
            ExecuteState::Failed(err) => return Err(err.clone()),
            ExecuteState::Running => return Ok(()),
            ExecuteState::NotStarted => {}
        }
        *self.state.borrow_mut() = ExecuteState::Running;

        let result = match &self.body {
            Body::Parsed { .. } => self.execute_parsed(),
            Body::ThirdParty { .. } => self.execute_third_party(),
        };

        match &result {
            Ok(()) => {
                self.deferred.activate();
                *self.state.borrow_mut() = ExecuteState::Done;
            }
            Err(err) => {
                *self.state.borrow_mut() = ExecuteState::Failed(err.clone());
            }
        }
        result
    }

    fn execute_parsed(&self) -> Result<(), CompartmentError> {
        let Body::Parsed {
            record,
            imported,
            once_var,
            live_var,
            functor,
        } = &self.body
        else {
            unreachable!()
        };
        let taken = functor.borrow_mut().take();
        let Some(functor) = taken else {
            return Ok(());
        };
        let imports = |update_record: UpdateRecord| -> Result<(), CompartmentError> {
            self.wire_imports(record, &imported.borrow(), update_record)
        };
        let ctx = FunctorContext {
            imports: &imports,
            once_var,
            live_var,
        };
        functor.call(ctx)
    }

    /// The core `imports` function: subscribes updaters to each named
    /// import, resolves `export *` ambiguity, and installs forwarding
    /// bindings for the survivors.
    fn wire_imports(
        &self,
        record: &ParsedModuleRecord,
        imported: &HashMap<Rc<str>, Rc<ModuleInstance>>,
        update_record: UpdateRecord,
    ) -> Result<(), CompartmentError> {
        for (specifier, import_updaters) in update_record {
            let dependency = imported.get(&specifier).cloned().ok_or_else(|| {
                CompartmentError::MalformedRecord {
                    specifier: self.specifier.clone(),
                    message: Rc::from(format!("no linked instance for import {specifier:?}")),
                }
            })?;
            dependency.execute()?;
            for (import_name, updaters) in import_updaters {
                let binding = dependency.notifier(&import_name).ok_or_else(|| {
                    CompartmentError::MissingExport {
                        specifier: dependency.specifier.clone(),
                        export_name: import_name.clone(),
                    }
                })?;
                for updater in updaters {
                    binding.notify(updater);
                }
            }
        }

        // `export *`: merge every reexport source's names (excluding
        // `default`), dropping names that collide across sources.
        let mut candidates: HashMap<Rc<str>, Rc<Binding>> = HashMap::new();
        let mut ambiguous: std::collections::HashSet<Rc<str>> = std::collections::HashSet::new();
        for specifier in &record.reexports {
            let dependency = imported.get(specifier).cloned().ok_or_else(|| {
                CompartmentError::MalformedRecord {
                    specifier: self.specifier.clone(),
                    message: Rc::from(format!("no linked instance for reexport {specifier:?}")),
                }
            })?;
            dependency.execute()?;
            for name in dependency.export_names() {
                if name.as_ref() == "default" {
                    continue;
                }
                if ambiguous.contains(&name) {
                    continue;
                }
                let binding = dependency.notifier(&name).unwrap();
                if candidates.contains_key(&name) {
                    ambiguous.insert(name.clone());
                    candidates.remove(&name);
                } else {
                    candidates.insert(name, binding);
                }
            }
        }

        let mut notifiers = self.notifiers.borrow_mut();
        for (name, source_binding) in candidates {
            if notifiers.contains_key(&name) {
                // Locally defined names win over `export *` forwarding.
                continue;
            }
            let forward = Binding::new(
                name.clone(),
                BindingKind::Live {
                    set_proxy_trap: false,
                },
            );
            let sink = forward.clone();
            source_binding.notify(Rc::new(move |value: &Value| {
                let _ = sink.update(value.clone());
            }));
            notifiers.insert(name, forward);
        }
        Ok(())
    }

    fn execute_third_party(&self) -> Result<(), CompartmentError> {
        let Body::ThirdParty {
            record,
            resolved_imports,
        } = &self.body
        else {
            unreachable!()
        };
        let exports = ThirdPartyExports {
            specifier: self.specifier.clone(),
            table: self.notifiers.clone(),
        };
        // Third-party `execute` is given `compartment`, but this instance
        // does not hold a back-reference to it (the compartment owns the
        // instance, not the reverse) beyond the one the linker stashes via
        // `set_owning_compartment`.
        record
            .execute
            .execute(&exports, self.host_compartment(), resolved_imports)
    }

    fn host_compartment(&self) -> &Compartment {
        self.owning_compartment
            .get()
            .expect("owning compartment set before execute")
    }
}

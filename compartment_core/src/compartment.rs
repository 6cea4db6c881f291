// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The compartment: the container owning a global object, evaluator,
//! module-record map, instance map, deferred-exports map, and the three host
//! hooks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::alias::{self, Alias};
use crate::error::CompartmentError;
use crate::functor::Evaluator;
use crate::hooks::{ImportHook, ImportHookResult, ModuleMapHook};
use crate::ident::is_valid_identifier;
use crate::instance::ModuleInstance;
use crate::namespace::{DeferredExports, ExportsNamespace};
use crate::record::ModuleRecord;
use crate::specifier::{FullSpecifier, ResolveHook};
use crate::value::Value;

/// Constructor options: name, global lexicals, the resolve/import/module-map
/// hooks, and the evaluator. Per-call transforms are carried by
/// [`crate::functor::EvaluateOptions`] rather than here, since they travel
/// with each `evaluate_module` call rather than being compartment-global.
pub struct CompartmentOptions {
    pub name: Option<Rc<str>>,
    pub global_lexicals: HashMap<Rc<str>, Value>,
    pub resolve_hook: Rc<dyn ResolveHook>,
    pub import_hook: Rc<dyn ImportHook>,
    pub module_map_hook: Option<Rc<dyn ModuleMapHook>>,
    pub evaluator: Rc<dyn Evaluator>,
}

/// A full specifier's discovery state in [`Compartment::module_records`]:
/// in flight, settled, or memoized as failed.
#[derive(Clone)]
pub(crate) enum RecordSlot {
    Pending(Shared<LocalBoxFuture<'static, Result<Rc<ModuleRecord>, CompartmentError>>>),
    Ready(Rc<ModuleRecord>),
    /// A rejected discovery, cached so repeated `load` calls for the same
    /// specifier fail identically instead of re-invoking the import hook.
    Failed(CompartmentError),
}

struct CompartmentInner {
    name: Option<Rc<str>>,
    endowments: RefCell<HashMap<Rc<str>, Value>>,
    global_lexicals: HashMap<Rc<str>, Value>,
    module_map: HashMap<FullSpecifier, Alias>,
    module_map_hook: Option<Rc<dyn ModuleMapHook>>,
    resolve_hook: Rc<dyn ResolveHook>,
    import_hook: Rc<dyn ImportHook>,
    evaluator: Rc<dyn Evaluator>,
    module_records: RefCell<HashMap<FullSpecifier, RecordSlot>>,
    instances: RefCell<HashMap<FullSpecifier, Rc<ModuleInstance>>>,
    deferred_exports: RefCell<HashMap<FullSpecifier, DeferredExports>>,
}

/// Cheaply cloneable: every clone is a handle onto the same module graph,
/// instance cache and deferred-exports table, which is what lets the loader
/// and linker pass `Compartment` by value through recursive async/sync
/// calls.
#[derive(Clone)]
pub struct Compartment(Rc<CompartmentInner>);

impl Compartment {
    /// Constructs a compartment from its endowments, module map, and options.
    ///
    /// Every entry of `module_map` must be an exports-proxy this process's
    /// [`alias::global_registry`] recognizes (i.e. obtained from some
    /// compartment's `module()`/`import()`); unrecognized entries fail
    /// construction, as does a `global_lexicals` key that is not a valid
    /// identifier.
    pub fn new(
        endowments: HashMap<Rc<str>, Value>,
        module_map: HashMap<FullSpecifier, ExportsNamespace>,
        options: CompartmentOptions,
    ) -> Result<Self, CompartmentError> {
        for name in options.global_lexicals.keys() {
            if !is_valid_identifier(name) {
                return Err(CompartmentError::type_error(
                    "globalLexicals key",
                    "a valid identifier",
                ));
            }
        }

        let registry = alias::global_registry();
        let mut resolved_module_map = HashMap::with_capacity(module_map.len());
        for (specifier, namespace) in module_map {
            let alias = registry.lookup(&namespace).ok_or_else(|| {
                CompartmentError::UnrecognizedAlias {
                    specifier: Rc::from(specifier.as_str()),
                }
            })?;
            resolved_module_map.insert(specifier, alias);
        }

        Ok(Self(Rc::new(CompartmentInner {
            name: options.name,
            endowments: RefCell::new(endowments),
            global_lexicals: options.global_lexicals,
            module_map: resolved_module_map,
            module_map_hook: options.module_map_hook,
            resolve_hook: options.resolve_hook,
            import_hook: options.import_hook,
            evaluator: options.evaluator,
            module_records: RefCell::new(HashMap::new()),
            instances: RefCell::new(HashMap::new()),
            deferred_exports: RefCell::new(HashMap::new()),
        })))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn endowment(&self, name: &str) -> Value {
        self.0
            .endowments
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    pub fn global_lexical(&self, name: &str) -> Option<&Value> {
        self.0.global_lexicals.get(name)
    }

    /// The general non-module script surface, delegated entirely to the
    /// host evaluator.
    pub fn evaluate(&self, source: &str) -> Result<Value, CompartmentError> {
        self.0
            .evaluator
            .evaluate_script(source, &self.0.endowments.borrow())
    }

    /// The deferred exports proxy for `specifier`, without loading it.
    pub fn module(&self, specifier: &FullSpecifier) -> ExportsNamespace {
        self.deferred_exports(specifier).namespace
    }

    /// Drives the loader to completion for `specifier`.
    pub fn load(&self, specifier: FullSpecifier) -> LocalBoxFuture<'static, Result<(), CompartmentError>> {
        crate::loader::load(self.clone(), specifier)
    }

    /// `load` followed by `import_now`.
    pub fn import(
        &self,
        specifier: FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ExportsNamespace, CompartmentError>> {
        let compartment = self.clone();
        Box::pin(async move {
            compartment.load(specifier.clone()).await?;
            compartment.import_now(&specifier)
        })
    }

    /// Links (synchronous, assumes `load` completed) and executes the root
    /// instance.
    pub fn import_now(&self, specifier: &FullSpecifier) -> Result<ExportsNamespace, CompartmentError> {
        let instance = crate::linker::link(self, specifier)?;
        instance.execute()?;
        Ok(instance.namespace().clone())
    }

    // --- Loader/linker-internal plumbing -----------------------------

    pub(crate) fn resolve_hook(&self) -> &Rc<dyn ResolveHook> {
        &self.0.resolve_hook
    }

    pub(crate) fn import_hook(&self) -> &Rc<dyn ImportHook> {
        &self.0.import_hook
    }

    pub(crate) fn evaluator(&self) -> &Rc<dyn Evaluator> {
        &self.0.evaluator
    }

    /// Consults the static module map first, then the module-map hook.
    pub(crate) fn module_map_alias(&self, specifier: &FullSpecifier) -> Option<Alias> {
        if let Some(alias) = self.0.module_map.get(specifier) {
            return Some(alias.clone());
        }
        self.0
            .module_map_hook
            .as_ref()
            .and_then(|hook| hook.resolve(specifier))
    }

    /// `Some(outcome)` once `specifier`'s own discovery step (not its
    /// transitive dependencies) has settled; `None` while it is still
    /// pending or has never been requested. Used by the loader's BFS to
    /// decide whether a specifier needs a fresh discovery step queued.
    pub(crate) fn resolved_record(
        &self,
        specifier: &FullSpecifier,
    ) -> Option<Result<Rc<ModuleRecord>, CompartmentError>> {
        match self.0.module_records.borrow().get(specifier) {
            Some(RecordSlot::Ready(record)) => Some(Ok(record.clone())),
            Some(RecordSlot::Failed(err)) => Some(Err(err.clone())),
            _ => None,
        }
    }

    /// Records a delegated record directly as `Ready`: an
    /// alias never needs its own fetch-in-flight bookkeeping, since the
    /// recursive `load` of the aliased specifier in the target compartment
    /// does all the waiting.
    pub(crate) fn store_delegated_record(&self, specifier: FullSpecifier, target: Alias) {
        let record = Rc::new(ModuleRecord::Delegated {
            specifier: specifier.clone(),
            target,
        });
        self.0
            .module_records
            .borrow_mut()
            .insert(specifier, RecordSlot::Ready(record));
    }

    /// Returns the (possibly still in-flight) fetch for `specifier`,
    /// creating it on first request. The returned future only performs this
    /// specifier's own `importHook`/`resolveHook` work; it does not recurse
    /// into dependencies, so two specifiers that are mutually dependent
    /// never end up awaiting each other's future from within the same poll
    /// (the loader's BFS, not this future, drives recursion; see
    /// `loader::load`).
    pub(crate) fn fetch_record(
        &self,
        specifier: FullSpecifier,
    ) -> Shared<LocalBoxFuture<'static, Result<Rc<ModuleRecord>, CompartmentError>>> {
        if let Some(slot) = self.0.module_records.borrow().get(&specifier) {
            return match slot {
                RecordSlot::Ready(record) => futures::future::ready(Ok(record.clone()))
                    .boxed_local()
                    .shared(),
                RecordSlot::Failed(err) => futures::future::ready(Err(err.clone()))
                    .boxed_local()
                    .shared(),
                RecordSlot::Pending(shared) => shared.clone(),
            };
        }

        let compartment = self.clone();
        let key = specifier.clone();
        let fut: LocalBoxFuture<'static, Result<Rc<ModuleRecord>, CompartmentError>> =
            Box::pin(async move {
                let result = compartment.discover_record(key.clone()).await;
                let mut records = compartment.0.module_records.borrow_mut();
                match &result {
                    Ok(record) => {
                        records.insert(key, RecordSlot::Ready(record.clone()));
                    }
                    Err(err) => {
                        records.insert(key, RecordSlot::Failed(err.clone()));
                    }
                }
                result
            });
        let shared = fut.shared();
        self.0
            .module_records
            .borrow_mut()
            .insert(specifier, RecordSlot::Pending(shared.clone()));
        shared
    }

    async fn discover_record(
        &self,
        requested: FullSpecifier,
    ) -> Result<Rc<ModuleRecord>, CompartmentError> {
        let result = self.0.import_hook.import(&requested).await?;
        let (static_record, canonical) = match result {
            ImportHookResult::Record(record) => (record, requested),
            ImportHookResult::Aliased { record, specifier } => (record, specifier),
        };
        let mut resolved_imports = HashMap::new();
        for import_specifier in static_record.effective_import_specifiers() {
            let full = self.0.resolve_hook.resolve(&import_specifier, &canonical)?;
            resolved_imports.insert(import_specifier, full);
        }
        Ok(Rc::new(ModuleRecord::Local {
            specifier: canonical,
            static_record,
            resolved_imports,
        }))
    }

    /// The linker's view of a loaded record: errors if `load` never reached
    /// `specifier`.
    pub(crate) fn module_record(
        &self,
        specifier: &FullSpecifier,
    ) -> Result<Rc<ModuleRecord>, CompartmentError> {
        match self.0.module_records.borrow().get(specifier) {
            Some(RecordSlot::Ready(record)) => Ok(record.clone()),
            _ => Err(CompartmentError::NotLoaded {
                specifier: specifier.clone(),
            }),
        }
    }

    pub(crate) fn cached_instance(&self, specifier: &FullSpecifier) -> Option<Rc<ModuleInstance>> {
        self.0.instances.borrow().get(specifier).cloned()
    }

    pub(crate) fn cache_instance(&self, specifier: FullSpecifier, instance: Rc<ModuleInstance>) {
        self.0.instances.borrow_mut().insert(specifier, instance);
    }

    /// Returns the same deferred-exports handle on repeated calls for
    /// `(self, specifier)`, registering the namespace in the process-wide
    /// alias registry the first time.
    pub(crate) fn deferred_exports(&self, specifier: &FullSpecifier) -> DeferredExports {
        if let Some(entry) = self.0.deferred_exports.borrow().get(specifier) {
            return entry.clone();
        }
        let entry = DeferredExports::new(specifier.clone());
        alias::global_registry().register(
            &entry.namespace,
            Alias {
                compartment: self.clone(),
                specifier: specifier.clone(),
            },
        );
        self.0
            .deferred_exports
            .borrow_mut()
            .insert(specifier.clone(), entry.clone());
        entry
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! After import, writing to the namespace fails with a type error,
//! `preventExtensions` is truthfully idempotent, and own keys come back
//! sorted.

mod common;

use std::collections::HashMap;
use std::rc::Rc;

use compartment_core::{
    Compartment, CompartmentError, CompartmentOptions, FullSpecifier, FunctorContext,
    FunctorSource, ModuleFunctor, ParsedModuleRecord, StaticModuleRecord, Value,
};

use common::{IdentityResolveHook, TableEvaluator, TableImportHook};

fn functor() -> Rc<dyn ModuleFunctor> {
    Rc::new(|ctx: FunctorContext<'_>| {
        ctx.once_var.get("zeta").expect("zeta").init(Value::from(1.0));
        ctx.once_var.get("alpha").expect("alpha").init(Value::from(2.0));
        ctx.once_var.get("mid").expect("mid").init(Value::from(3.0));
        Ok(())
    })
}

#[test]
fn namespace_is_frozen_sorted_and_idempotently_non_extensible() {
    let evaluator = TableEvaluator::new();
    evaluator.register("exotic", functor());

    let record = StaticModuleRecord::parsed(ParsedModuleRecord {
        imports: Vec::new(),
        fixed_export_map: HashMap::from([
            (Rc::from("zeta"), Rc::from("zeta")),
            (Rc::from("alpha"), Rc::from("alpha")),
            (Rc::from("mid"), Rc::from("mid")),
        ]),
        live_export_map: HashMap::new(),
        reexports: Vec::new(),
        functor_source: FunctorSource::from("exotic"),
    })
    .unwrap();

    let compartment = Compartment::new(
        HashMap::new(),
        HashMap::new(),
        CompartmentOptions {
            name: Some(Rc::from("exotic")),
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(TableImportHook::new(HashMap::from([(
                FullSpecifier::from("exotic.js"),
                record,
            )]))),
            module_map_hook: None,
            evaluator: Rc::new(evaluator),
        },
    )
    .unwrap();

    let namespace =
        futures::executor::block_on(compartment.import(FullSpecifier::from("exotic.js"))).unwrap();

    let keys = namespace.own_keys().unwrap();
    assert_eq!(keys.iter().map(Rc::as_ref).collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);

    assert!(matches!(
        namespace.set("alpha", Value::from(99.0)),
        Err(CompartmentError::FrozenNamespace { .. })
    ));

    assert!(namespace.prevent_extensions());
    assert!(namespace.prevent_extensions());
}

#[test]
fn a_pending_namespace_throws_instead_of_reading_undefined() {
    let compartment = Compartment::new(
        HashMap::new(),
        HashMap::new(),
        CompartmentOptions {
            name: Some(Rc::from("pending")),
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(TableImportHook::new(HashMap::new())),
            module_map_hook: None,
            evaluator: Rc::new(TableEvaluator::new()),
        },
    )
    .unwrap();

    // `module()` hands out the deferred exports proxy without loading.
    let namespace = compartment.module(&FullSpecifier::from("never-loaded.js"));
    assert!(!namespace.is_active());
    assert!(matches!(
        namespace.get("anything"),
        Err(CompartmentError::TemporalDeadZone { .. })
    ));
}

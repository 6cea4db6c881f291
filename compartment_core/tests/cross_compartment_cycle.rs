// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A mutual cycle across compartments: compartment `even` imports `odd`,
//! compartment `odd` imports `even`, wired through each other's
//! `moduleMapHook` rather than a static `moduleMap`. The two compartments
//! cannot otherwise be constructed, since each would need the other's
//! namespace before it exists.

mod common;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use compartment_core::{
    Alias, Compartment, CompartmentError, CompartmentOptions, FullSpecifier, FunctorContext,
    FunctorSource, ModuleFunctor, ParsedModuleRecord, StaticModuleRecord, UpdateRecord, Value,
};

use common::{IdentityResolveHook, TableEvaluator, TableImportHook};

/// `isEven`/`isOdd` both have this shape: recurse into the other predicate
/// on `n - 1`, bottoming out at `n == 0`.
fn predicate_functor(peer_specifier: &'static str) -> Rc<dyn ModuleFunctor> {
    Rc::new(move |ctx: FunctorContext<'_>| {
        let peer: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
        let sink = peer.clone();
        let updater: Rc<dyn Fn(&Value)> = Rc::new(move |v: &Value| {
            *sink.borrow_mut() = Some(v.clone());
        });
        let mut update_record: UpdateRecord = HashMap::new();
        update_record.insert(
            Rc::from(peer_specifier),
            HashMap::from([(Rc::from("default"), vec![updater])]),
        );
        (ctx.imports)(update_record)?;

        let predicate = Value::function(move |args: &[Value]| {
            let n = args
                .first()
                .and_then(Value::as_number)
                .ok_or_else(|| CompartmentError::type_error("argument", "a number"))?;
            if n == 0.0 {
                return Ok(Value::from(true));
            }
            let peer_predicate = peer
                .borrow()
                .clone()
                .ok_or_else(|| CompartmentError::type_error("peer predicate", "an initialized binding"))?;
            peer_predicate.call(&[Value::from(n - 1.0)])
        });
        ctx.once_var.get("default").expect("default once_var").init(predicate);
        Ok(())
    })
}

fn predicate_record(imports_peer: &str) -> Rc<StaticModuleRecord> {
    StaticModuleRecord::parsed(ParsedModuleRecord {
        imports: vec![Rc::from(imports_peer)],
        fixed_export_map: HashMap::from([(Rc::from("default"), Rc::from("default"))]),
        live_export_map: HashMap::new(),
        reexports: Vec::new(),
        functor_source: FunctorSource::from("predicate"),
    })
    .expect("well-formed record")
}

#[test]
fn even_and_odd_resolve_through_each_others_module_map_hook() {
    let even_evaluator = TableEvaluator::new();
    even_evaluator.register("predicate", predicate_functor("odd.js"));
    let odd_evaluator = TableEvaluator::new();
    odd_evaluator.register("predicate", predicate_functor("even.js"));

    let odd_cell: Rc<RefCell<Option<Compartment>>> = Rc::new(RefCell::new(None));
    let odd_cell_for_even_hook = odd_cell.clone();

    let even = Compartment::new(
        HashMap::new(),
        HashMap::new(),
        CompartmentOptions {
            name: Some(Rc::from("even")),
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(TableImportHook::new(HashMap::from([(
                FullSpecifier::from("even.js"),
                predicate_record("odd.js"),
            )]))),
            module_map_hook: Some(Rc::new(move |specifier: &FullSpecifier| -> Option<Alias> {
                let odd = odd_cell_for_even_hook.borrow().clone()?;
                (specifier.as_str() == "odd.js").then(|| Alias {
                    compartment: odd,
                    specifier: FullSpecifier::from("odd.js"),
                })
            })),
            evaluator: Rc::new(even_evaluator),
        },
    )
    .unwrap();

    let even_for_odd_hook = even.clone();
    let odd = Compartment::new(
        HashMap::new(),
        HashMap::new(),
        CompartmentOptions {
            name: Some(Rc::from("odd")),
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(TableImportHook::new(HashMap::from([(
                FullSpecifier::from("odd.js"),
                predicate_record("even.js"),
            )]))),
            module_map_hook: Some(Rc::new(move |specifier: &FullSpecifier| -> Option<Alias> {
                (specifier.as_str() == "even.js").then(|| Alias {
                    compartment: even_for_odd_hook.clone(),
                    specifier: FullSpecifier::from("even.js"),
                })
            })),
            evaluator: Rc::new(odd_evaluator),
        },
    )
    .unwrap();
    *odd_cell.borrow_mut() = Some(odd.clone());

    let is_even = futures::executor::block_on(even.import(FullSpecifier::from("even.js")))
        .unwrap()
        .get("default")
        .unwrap();
    let is_odd = futures::executor::block_on(odd.import(FullSpecifier::from("odd.js")))
        .unwrap()
        .get("default")
        .unwrap();

    for n in [0.0, 2.0, 4.0] {
        assert_eq!(is_even.call(&[Value::from(n)]).unwrap().as_bool(), Some(true));
    }
    for n in [1.0, 3.0, 5.0] {
        assert_eq!(is_odd.call(&[Value::from(n)]).unwrap().as_bool(), Some(true));
    }
}

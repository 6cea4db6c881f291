// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The import hook, asked for `./main`, returns
//! `{ record, specifier: "./main/index.js" }`: an index-file redirect.
//! Importing `./main` and importing `./main/index.js` directly both
//! succeed and see the same exported value. They are not asserted to be
//! the *same instance*: discovery caches records under the requested
//! specifier, so two distinct request specifiers sharing one canonical
//! response specifier legitimately produce two instances (see `DESIGN.md`).

mod common;

use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use compartment_core::{
    Compartment, CompartmentError, CompartmentOptions, FullSpecifier, FunctorContext,
    FunctorSource, ImportHook, ImportHookResult, ModuleFunctor, ParsedModuleRecord,
    StaticModuleRecord, Value,
};

use common::{IdentityResolveHook, TableEvaluator};

struct IndexRedirectHook {
    record: Rc<StaticModuleRecord>,
}

impl ImportHook for IndexRedirectHook {
    fn import(
        &self,
        full_specifier: &FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>> {
        let record = self.record.clone();
        let specifier = full_specifier.clone();
        async move {
            match specifier.as_str() {
                "./main" => Ok(ImportHookResult::Aliased {
                    record,
                    specifier: FullSpecifier::from("./main/index.js"),
                }),
                "./main/index.js" => Ok(ImportHookResult::Record(record)),
                other => Err(CompartmentError::ImportFailed {
                    specifier: FullSpecifier::from(other.to_string()),
                    message: Rc::from("unknown specifier"),
                }),
            }
        }
        .boxed_local()
    }
}

fn main_functor() -> Rc<dyn ModuleFunctor> {
    Rc::new(|ctx: FunctorContext<'_>| {
        ctx.once_var
            .get("meaning")
            .expect("meaning once_var")
            .init(Value::from(42.0));
        Ok(())
    })
}

#[test]
fn redirected_and_canonical_specifiers_both_resolve() {
    let record = StaticModuleRecord::parsed(ParsedModuleRecord {
        imports: Vec::new(),
        fixed_export_map: HashMap::from([(Rc::from("meaning"), Rc::from("meaning"))]),
        live_export_map: HashMap::new(),
        reexports: Vec::new(),
        functor_source: FunctorSource::from("main"),
    })
    .unwrap();

    let evaluator = TableEvaluator::new();
    evaluator.register("main", main_functor());

    let compartment = Compartment::new(
        HashMap::new(),
        HashMap::new(),
        CompartmentOptions {
            name: Some(Rc::from("redirect")),
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(IndexRedirectHook { record }),
            module_map_hook: None,
            evaluator: Rc::new(evaluator),
        },
    )
    .unwrap();

    let via_redirect = futures::executor::block_on(compartment.import(FullSpecifier::from("./main")))
        .unwrap();
    assert_eq!(via_redirect.get("meaning").unwrap().as_number(), Some(42.0));

    let via_canonical =
        futures::executor::block_on(compartment.import(FullSpecifier::from("./main/index.js"))).unwrap();
    assert_eq!(via_canonical.get("meaning").unwrap().as_number(), Some(42.0));
}

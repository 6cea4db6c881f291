// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Endowment isolation, at the layer this crate actually controls:
//! `endowments` are copied onto one compartment's global at construction
//! and never shared with another compartment's. Realizing that isolation
//! *inside* a module body's lexical scope is scope-proxy construction,
//! which this crate explicitly delegates to the host: a parsed module's
//! functor is never handed a reference to the compartment or its
//! endowments at all, only `imports`/`onceVar`/`liveVar`, so there is no
//! channel through which it even could observe another compartment's
//! globals.

mod common;

use std::collections::HashMap;
use std::rc::Rc;

use compartment_core::{Compartment, CompartmentOptions, Value};

use common::{IdentityResolveHook, TableEvaluator, TableImportHook};

fn bare_compartment(endowments: HashMap<Rc<str>, Value>) -> Compartment {
    Compartment::new(
        endowments,
        HashMap::new(),
        CompartmentOptions {
            name: None,
            global_lexicals: HashMap::new(),
            resolve_hook: Rc::new(IdentityResolveHook),
            import_hook: Rc::new(TableImportHook::new(HashMap::new())),
            module_map_hook: None,
            evaluator: Rc::new(TableEvaluator::new()),
        },
    )
    .unwrap()
}

#[test]
fn endowments_do_not_cross_compartment_boundaries() {
    let with_double = bare_compartment(HashMap::from([(
        Rc::from("double"),
        Value::function(|args: &[Value]| {
            Ok(Value::from(args[0].as_number().unwrap_or_default() * 2.0))
        }),
    )]));
    let without_double = bare_compartment(HashMap::new());

    let double = with_double.endowment("double");
    assert_eq!(double.call(&[Value::from(21.0)]).unwrap().as_number(), Some(42.0));

    assert!(matches!(without_double.endowment("double"), Value::Undefined));
}

#[test]
fn evaluate_only_sees_its_own_compartments_endowments() {
    let with_double = bare_compartment(HashMap::from([(Rc::from("double"), Value::from(true))]));
    let without_double = bare_compartment(HashMap::new());

    assert!(with_double.evaluate("double").is_ok());
    assert!(without_double.evaluate("double").is_err());
}

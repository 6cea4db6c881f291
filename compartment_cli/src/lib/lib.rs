// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal filesystem-backed host for `compartment_core`: wires a
//! [`compartment_core::Compartment`] up with the path-based resolve/import
//! hooks in [`fs_hooks`] and the toy evaluator in [`mini_lang`], so a module
//! graph can be loaded and executed straight from disk.

pub mod error;
pub mod fs_hooks;
pub mod mini_lang;

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use compartment_core::{
    Compartment, CompartmentError, CompartmentOptions, ExportsNamespace, FullSpecifier, Value,
};

pub use error::CliError;

/// Host-supplied endowments and global lexicals for a root compartment.
/// `Default` yields an empty set; [`new_fs_compartment`] always adds its own
/// `console` endowment on top, so a caller only needs this for anything
/// beyond that.
#[derive(Default)]
pub struct HostConfig {
    pub name: Option<Rc<str>>,
    pub endowments: HashMap<Rc<str>, Value>,
    pub global_lexicals: HashMap<Rc<str>, Value>,
}

/// A `console.log`-shaped endowment: the only built-in this host offers
/// demo modules, so a smoke-test import tree has something observable to
/// call without needing a real standard library.
fn console_endowment() -> Value {
    Value::object([(
        Rc::from("log"),
        Value::function(|args: &[Value]| {
            let rendered: Vec<String> = args.iter().map(|v| format!("{v:?}")).collect();
            println!("{}", rendered.join(" "));
            Ok(Value::Undefined)
        }),
    )])
}

/// Builds a root compartment backed by [`fs_hooks::FsResolveHook`],
/// [`fs_hooks::FsImportHook`] and [`mini_lang::MiniLangEvaluator`].
pub fn new_fs_compartment(mut config: HostConfig) -> Result<Compartment, CompartmentError> {
    config
        .endowments
        .entry(Rc::from("console"))
        .or_insert_with(console_endowment);

    let options = CompartmentOptions {
        name: config.name,
        global_lexicals: config.global_lexicals,
        resolve_hook: Rc::new(fs_hooks::FsResolveHook),
        import_hook: Rc::new(fs_hooks::FsImportHook),
        module_map_hook: None,
        evaluator: Rc::new(mini_lang::MiniLangEvaluator),
    };
    Compartment::new(config.endowments, HashMap::new(), options)
}

/// Loads and imports the module tree rooted at `path` (load, then
/// `importNow`, matching `compartment.import`).
pub async fn import_file(
    compartment: &Compartment,
    path: &Path,
) -> Result<ExportsNamespace, CompartmentError> {
    let specifier = fs_hooks::path_to_specifier(path)?;
    import_specifier(compartment, specifier).await
}

pub async fn import_specifier(
    compartment: &Compartment,
    specifier: FullSpecifier,
) -> Result<ExportsNamespace, CompartmentError> {
    compartment.import(specifier).await
}

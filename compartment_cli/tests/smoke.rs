// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end smoke test: writes a small multi-file module tree to a
//! tempdir and drives it through `new_fs_compartment`/`import_file`, so the
//! filesystem resolve/import hooks and the `mini_lang` evaluator are
//! exercised against real files on disk rather than only through the
//! narrow unit tests in `fs_hooks.rs`/`mini_lang.rs`.

use std::fs;

use compartment_cli::{import_file, new_fs_compartment, HostConfig};
use compartment_core::Value;

#[test]
fn imports_a_two_file_module_tree_from_disk() {
    let dir = tempfile::tempdir().expect("create tempdir");

    fs::write(
        dir.path().join("leaf.js"),
        r#"export const message = "hello from leaf";"#,
    )
    .expect("write leaf.js");

    fs::write(
        dir.path().join("entry.js"),
        r#"
        import { message } from "./leaf.js";
        export default { greeting: message };
        "#,
    )
    .expect("write entry.js");

    let compartment = new_fs_compartment(HostConfig::default()).expect("construct compartment");
    let namespace = futures::executor::block_on(import_file(
        &compartment,
        &dir.path().join("entry.js"),
    ))
    .expect("import should succeed");

    let default = namespace.get("default").expect("default export readable");
    match default.get("greeting") {
        Value::String(greeting) => assert_eq!(greeting.as_ref(), "hello from leaf"),
        other => panic!("expected a string greeting, found {other:?}"),
    }
}

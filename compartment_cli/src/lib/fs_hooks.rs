// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A filesystem-backed `resolveHook`/`importHook` pair: full specifiers are
//! normalized absolute paths, import specifiers are Node-ish relative paths
//! with an explicit extension.

use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use compartment_core::{CompartmentError, FullSpecifier, ImportHook, ImportHookResult, ResolveHook};

use crate::mini_lang;

/// Lexically collapses `.`/`..` components without touching the filesystem:
/// symlinks are not this CLI's concern, it only needs a stable string to
/// use as a full specifier.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Turns a filesystem path given on the command line into the full
/// specifier this host uses as a module graph root.
pub fn path_to_specifier(path: &Path) -> Result<FullSpecifier, CompartmentError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|err| CompartmentError::ImportFailed {
            specifier: FullSpecifier::from(path.to_string_lossy().into_owned()),
            message: Rc::from(err.to_string()),
        })?;
        cwd.join(path)
    };
    Ok(FullSpecifier::from(
        normalize(&absolute).to_string_lossy().into_owned(),
    ))
}

/// Relative-path resolution against a referrer full specifier: only
/// `./`/`../`-prefixed specifiers are supported, matching this CLI's
/// demo modules. Bare/package specifiers are out of scope: no
/// `node_modules` resolution.
pub struct FsResolveHook;

impl ResolveHook for FsResolveHook {
    fn resolve(
        &self,
        import_specifier: &str,
        referrer_full_specifier: &FullSpecifier,
    ) -> Result<FullSpecifier, CompartmentError> {
        if !(import_specifier.starts_with("./") || import_specifier.starts_with("../")) {
            return Err(CompartmentError::ResolutionFailed {
                import_specifier: Rc::from(import_specifier),
                referrer: referrer_full_specifier.clone(),
                message: Rc::from(
                    "only relative specifiers starting with \"./\" or \"../\" are supported",
                ),
            });
        }
        let referrer_path = Path::new(referrer_full_specifier.as_str());
        let base = referrer_path.parent().unwrap_or_else(|| Path::new("/"));
        let joined = normalize(&base.join(import_specifier));
        Ok(FullSpecifier::from(joined.to_string_lossy().into_owned()))
    }
}

/// Reads a full specifier's source off disk and compiles it with
/// [`mini_lang`]. Synchronous under the hood (`std::fs::read_to_string`) but
/// still handed back as a boxed future, matching the async `importHook`
/// contract a host backed by a network fetch would need.
pub struct FsImportHook;

impl ImportHook for FsImportHook {
    fn import(
        &self,
        full_specifier: &FullSpecifier,
    ) -> LocalBoxFuture<'static, Result<ImportHookResult, CompartmentError>> {
        let specifier = full_specifier.clone();
        Box::pin(async move {
            let path = Path::new(specifier.as_str());
            let source = std::fs::read_to_string(path).map_err(|err| CompartmentError::ImportFailed {
                specifier: specifier.clone(),
                message: Rc::from(err.to_string()),
            })?;
            let record = mini_lang::compile_record(&source)?;
            Ok(ImportHookResult::Record(record))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_sibling_and_parent_relative_specifiers() {
        let referrer = FullSpecifier::from("/project/src/entry.js");
        let hook = FsResolveHook;
        assert_eq!(
            hook.resolve("./leaf.js", &referrer).unwrap().as_str(),
            "/project/src/leaf.js"
        );
        assert_eq!(
            hook.resolve("../shared/util.js", &referrer).unwrap().as_str(),
            "/project/shared/util.js"
        );
    }

    #[test]
    fn rejects_bare_specifiers() {
        let referrer = FullSpecifier::from("/project/src/entry.js");
        assert!(FsResolveHook.resolve("lodash", &referrer).is_err());
    }
}

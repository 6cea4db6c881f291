// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The loader: transitive, async discovery of every module reachable from a
//! root full specifier.
//!
//! Discovery is organized as a breadth-first worklist (`FuturesUnordered`)
//! rather than as one deeply recursive future per specifier. Each queued
//! step only performs *that specifier's own* `importHook`/`resolveHook`
//! work (see [`crate::compartment::Compartment::fetch_record`]) and reports
//! back the further specifiers it needs; the worklist itself does the
//! recursion. This keeps a cyclic subgraph (A imports B imports A) from ever
//! requiring one specifier's in-flight future to be polled from within its
//! own call stack: the cycle is broken by the `seen` set below, not by
//! waiting on a future that can't yet resolve.

use std::collections::HashSet;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace, warn};

use crate::compartment::Compartment;
use crate::error::CompartmentError;
use crate::record::ModuleRecord;
use crate::specifier::FullSpecifier;

enum StepOutcome {
    /// Delegated to another compartment, which did its own (recursive)
    /// `load`. Nothing further to enqueue here.
    Delegated,
    /// A local record was fetched; these are the further specifiers
    /// (`imports` ∪ `export *` sources) it names.
    Local { next: Vec<FullSpecifier> },
}

/// Resolves once every module reachable from `root` has a `ModuleRecord` in
/// `compartment`'s record map; rejects with the first discovery error
/// encountered. Other in-flight discoveries are not cancelled on error:
/// their results are still cached.
pub(crate) fn load(
    compartment: Compartment,
    root: FullSpecifier,
) -> LocalBoxFuture<'static, Result<(), CompartmentError>> {
    Box::pin(async move {
        debug!(specifier = %root, compartment = compartment.name().unwrap_or("<anonymous>"), "load: starting discovery");
        let mut seen: HashSet<FullSpecifier> = HashSet::new();
        let mut frontier: FuturesUnordered<LocalBoxFuture<'static, Result<StepOutcome, CompartmentError>>> =
            FuturesUnordered::new();
        enqueue(&compartment, root.clone(), &mut seen, &mut frontier);

        let mut first_error: Option<CompartmentError> = None;
        while let Some(outcome) = frontier.next().await {
            match outcome {
                Ok(StepOutcome::Delegated) => {}
                Ok(StepOutcome::Local { next }) => {
                    for specifier in next {
                        enqueue(&compartment, specifier, &mut seen, &mut frontier);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "load: discovery step failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(specifier = %root, "load: discovery complete");
                Ok(())
            }
        }
    })
}

/// Queues a discovery step for `specifier` unless it has already settled in
/// `compartment`'s record map or is already queued this traversal (`seen`),
/// so the import hook is never called twice for the same specifier.
fn enqueue(
    compartment: &Compartment,
    specifier: FullSpecifier,
    seen: &mut HashSet<FullSpecifier>,
    frontier: &mut FuturesUnordered<LocalBoxFuture<'static, Result<StepOutcome, CompartmentError>>>,
) {
    if !seen.insert(specifier.clone()) {
        return;
    }
    if let Some(outcome) = compartment.resolved_record(&specifier) {
        // Already settled by an earlier `load` call on this compartment;
        // surface a cached failure but never re-invoke the hooks.
        if let Err(err) = outcome {
            frontier.push(Box::pin(async move { Err(err) }));
        }
        return;
    }
    let compartment = compartment.clone();
    frontier.push(Box::pin(async move { step(compartment, specifier).await }));
}

async fn step(compartment: Compartment, specifier: FullSpecifier) -> Result<StepOutcome, CompartmentError> {
    trace!(specifier = %specifier, "load: discovering specifier");

    // The static moduleMap, then the moduleMapHook.
    if let Some(alias) = compartment.module_map_alias(&specifier) {
        trace!(specifier = %specifier, target = alias.specifier.as_str(), "load: delegating to module-map alias");
        load(alias.compartment.clone(), alias.specifier.clone()).await?;
        compartment.store_delegated_record(specifier, alias);
        return Ok(StepOutcome::Delegated);
    }

    // Memoized fetch, then compute the further specifiers to recurse into.
    let record = compartment.fetch_record(specifier).await?;
    match &*record {
        ModuleRecord::Local {
            resolved_imports, ..
        } => Ok(StepOutcome::Local {
            next: resolved_imports.values().cloned().collect(),
        }),
        ModuleRecord::Delegated { .. } => Ok(StepOutcome::Delegated),
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! This host's own error type: a thin wrapper so `main` has one error type
//! to propagate with `?` instead of matching on `compartment_core`'s and
//! `clap`'s separately.

use compartment_core::CompartmentError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Compartment(#[from] CompartmentError),
}

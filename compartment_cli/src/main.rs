// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};
use compartment_cli::{self as lib, CliError, HostConfig};
use console::style;

/// A filesystem-backed host for confined execution compartments
#[derive(Debug, ClapParser)]
#[command(name = "compartment")]
#[command(about = "A filesystem-backed host for confined execution compartments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Loads and imports a module tree rooted at `path`, printing its
    /// namespace's own keys and values.
    Import {
        /// The entry module's path on disk.
        path: PathBuf,
    },
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    match args.command {
        Command::Import { path } => {
            let compartment = lib::new_fs_compartment(HostConfig::default())?;
            let namespace = futures::executor::block_on(lib::import_file(&compartment, &path))?;
            for name in namespace.own_keys()? {
                let value = namespace.get(&name)?;
                println!("{} {} = {:?}", style(path.display()).dim(), name, value);
            }
        }
    }
    Ok(())
}

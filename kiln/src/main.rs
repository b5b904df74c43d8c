// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

mod audit;
mod cli;
mod executor;
mod filter;
mod installation;
mod runtime;
mod settings;
mod signal;
mod store;
mod ui;
mod universe;
mod util;

use crate::cli::Error;

use tracing::error;

/// Main entry point
fn main() {
    match cli::process() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let code = err.exit_code();
            report_error(err);
            std::process::exit(code);
        }
    }
}

/// Report an execution error to the user
fn report_error(error: Error) {
    // Collect the full error chain into a single string
    let chain = std::iter::successors(Some(&error as &dyn std::error::Error), |e| e.source())
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ");

    // Log with tracing and print to console
    error!(%chain, "Command execution failed");
    println!("Error: {chain}");
}

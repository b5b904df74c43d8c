// SPDX-FileCopyrightText: 2023 AerynOS Developers
// SPDX-License-Identifier: MPL-2.0

//! Thin terminal UI helpers shared by the CLI: coloured text via
//! `crossterm`, progress bars via `indicatif`, and a yes/no prompt via
//! `dialoguer`.

pub use crossterm::style::Stylize as Styled;
pub use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Ask the user a yes/no question on stderr-adjacent stdout, defaulting
/// to "no" if input can't be read (e.g. non-interactive stdin).
pub fn confirm(prompt: impl Into<String>) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(prompt.into())
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// A spinner-styled progress bar matching the template used across the
/// CLI's download/build stages.
pub fn spinner(message: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner().with_message(message);
    pb.set_style(
        ProgressStyle::with_template(" {spinner} {wide_msg}")
            .expect("valid template")
            .tick_chars("--=≡■≡=--"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(150));
    pb
}

// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Terminal presentation of the apply preview, confirmation prompt, and
//! post-install messages (§4.1, §4.6). The engine stays terminal-agnostic;
//! this is the CLI's concrete [`kiln_engine::Ui`].

use kiln_engine::{Action, RenderedMessage, Solution, Ui};
use tui::Styled;

#[derive(Debug, Default)]
pub struct TerminalUi {
    pub auto_yes: bool,
}

impl Ui for TerminalUi {
    fn render_preview(&self, solution: &Solution) {
        let actions: Vec<&Action> = solution.to_process.iter_nodes().collect();
        if actions.is_empty() {
            return;
        }

        println!("The following actions will be applied:");
        for action in &actions {
            println!("  {} {}", action.verb(), action.package());
        }
        println!("{} package(s) total.", actions.len());
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.auto_yes {
            return true;
        }
        tui::confirm(prompt.to_string())
    }

    fn report(&self, text: &str) {
        println!("{}", text.to_string().red());
    }

    fn post_install_message(&self, rendered: &RenderedMessage) {
        let header = if rendered.success {
            rendered.package_header.clone().green()
        } else {
            rendered.package_header.clone().red()
        };
        println!("{header}: {}", rendered.body);
    }
}

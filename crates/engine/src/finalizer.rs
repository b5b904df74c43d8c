// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Explicit finalizer stack (§9 "Finalizer chain").
//!
//! The source threads a growing zero-argument closure through each
//! stage. Here each stage pushes its own finalizer onto a plain stack,
//! and the caller guarantees the whole stack runs on every exit path
//! (success, classified error, or interruption) by calling
//! [`Finalizers::run`] in a single place at the end of `parallel_apply`.

pub struct Finalizers(Vec<Box<dyn FnOnce() + Send>>);

impl Finalizers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, finalizer: impl FnOnce() + Send + 'static) {
        self.0.push(Box::new(finalizer));
    }

    /// Runs every registered finalizer in registration order, continuing
    /// even if the stack is empty. Finalizers are best-effort: none of
    /// them return a `Result`, matching the source's fire-and-forget
    /// cleanup semantics.
    pub fn run(self) {
        for finalizer in self.0 {
            finalizer();
        }
    }
}

impl Default for Finalizers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut finalizers = Finalizers::new();

        for i in 0..3 {
            let log = log.clone();
            finalizers.push(move || log.lock().unwrap().push(i));
        }
        finalizers.run();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }
}

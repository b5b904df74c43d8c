// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Environment-variable warnings, emitted at most once per process (§4.9).
//!
//! The source keys this off a global boolean; per §9's design note we use
//! a scoped init-once primitive instead — [`EnvWarningGuard`] is owned by
//! the caller (typically the CLI's `Client`, constructed once at process
//! startup) rather than living behind a module-level static, which keeps
//! it free of cross-test interference.

use std::{collections::HashMap, sync::Once};

use tracing::debug;

use crate::{error::Error, state::TransientState};

/// Supplies the two variable sets §4.9 warns about. Backed by the
/// package manifest accessor, which is out of scope here (§6).
pub trait EnvWarningSource {
    /// Fixed toolchain variable names, relevant only if the associated
    /// toolchain package is installed.
    fn toolchain_variables(&self, state: &TransientState) -> Vec<String>;

    /// `⋃_other_compilers vars(compiler) \ vars(current_compiler)`, where
    /// `vars(c)` is the set of variables `c`'s manifest defines with `=`.
    fn compiler_variable_diff(&self, state: &TransientState) -> Vec<String>;
}

pub struct EnvWarningGuard(Once);

impl EnvWarningGuard {
    pub fn new() -> Self {
        Self(Once::new())
    }

    /// Runs the warning check exactly once across the lifetime of this
    /// guard. Subsequent calls are no-ops that return `Ok(())`.
    ///
    /// `confirm` is invoked with the offending variable names iff at
    /// least one is set in `env`; declining (`confirm` returns `false`)
    /// maps to [`Error::EnvWarningDeclined`].
    pub fn warn_once(
        &self,
        source: &dyn EnvWarningSource,
        state: &TransientState,
        env: &HashMap<String, String>,
        confirm: impl FnOnce(&[String]) -> bool,
    ) -> Result<(), Error> {
        let mut declined = false;

        self.0.call_once(|| {
            let mut vars = source.toolchain_variables(state);
            vars.extend(source.compiler_variable_diff(state));
            vars.sort();
            vars.dedup();

            let present: Vec<String> = vars.into_iter().filter(|v| env.contains_key(v)).collect();

            if present.is_empty() {
                debug!("no interfering environment variables set");
            } else if !confirm(&present) {
                declined = true;
            }
        });

        if declined { Err(Error::EnvWarningDeclined) } else { Ok(()) }
    }
}

impl Default for EnvWarningGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoVars;
    impl EnvWarningSource for NoVars {
        fn toolchain_variables(&self, _: &TransientState) -> Vec<String> {
            vec!["CC".into()]
        }
        fn compiler_variable_diff(&self, _: &TransientState) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn only_warns_when_variable_present_in_env() {
        let guard = EnvWarningGuard::new();
        let state = TransientState::new();
        let env = HashMap::new();

        let result = guard.warn_once(&NoVars, &state, &env, |_| false);
        assert!(result.is_ok(), "no variables set, confirm must not be invoked");
    }

    #[test]
    fn runs_at_most_once() {
        let guard = EnvWarningGuard::new();
        let state = TransientState::new();
        let mut env = HashMap::new();
        env.insert("CC".to_string(), "clang".to_string());

        let mut invocations = 0;
        let _ = guard.warn_once(&NoVars, &state, &env, |_| {
            invocations += 1;
            true
        });
        let _ = guard.warn_once(&NoVars, &state, &env, |_| {
            invocations += 1;
            true
        });

        assert_eq!(invocations, 1);
    }

    #[test]
    fn decline_surfaces_as_error() {
        let guard = EnvWarningGuard::new();
        let state = TransientState::new();
        let mut env = HashMap::new();
        env.insert("CC".to_string(), "clang".to_string());

        let result = guard.warn_once(&NoVars, &state, &env, |_| false);
        assert!(matches!(result, Err(Error::EnvWarningDeclined)));
    }
}

// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Post-install message filter language (§4.6, §9): a tiny boolean
//! expression over `success`/`failure`/`always`, combined with `&&`,
//! `||` and a leading `!`, plus `{name}`/`{version}` template
//! substitution.

use kiln_engine::{FilterEvaluator, Package};

#[derive(Debug, Default)]
pub struct MessageFilter;

impl FilterEvaluator for MessageFilter {
    fn eval_filter(&self, _package: &Package, success: bool, failure: bool, filter: &str) -> bool {
        eval(filter.trim(), success, failure)
    }

    fn substitute_string(&self, package: &Package, _success: bool, _failure: bool, template: &str) -> String {
        template
            .replace("{name}", package.name.as_str())
            .replace("{version}", package.version.as_str())
    }
}

/// Evaluates an `&&`-joined conjunction of (possibly `!`-negated) atoms.
/// `||` splits into alternatives evaluated left to right; the first
/// `&&`-split is the lowest-precedence operator, matching the grammar a
/// reader would expect from a one-line boolean filter.
fn eval(filter: &str, success: bool, failure: bool) -> bool {
    if filter.is_empty() {
        return true;
    }

    filter.split("||").any(|clause| {
        clause.split("&&").all(|atom| {
            let atom = atom.trim();
            let (negate, atom) = atom.strip_prefix('!').map_or((false, atom), |rest| (true, rest.trim()));
            let value = match atom {
                "success" => success,
                "failure" => failure,
                "always" | "" => true,
                _ => false,
            };
            value != negate
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_success_and_failure() {
        assert!(eval("success", true, false));
        assert!(!eval("success", false, true));
        assert!(eval("failure", false, true));
    }

    #[test]
    fn negation_and_conjunction() {
        assert!(eval("!failure && success", true, false));
        assert!(!eval("!failure && success", false, true));
    }

    #[test]
    fn disjunction() {
        assert!(eval("success || failure", false, true));
    }

    #[test]
    fn empty_filter_always_renders() {
        assert!(eval("", false, true));
        assert!(eval("always", true, false));
    }

    #[test]
    fn substitution_replaces_both_placeholders() {
        let filter = MessageFilter;
        let package = Package::new("foo", "1.2");
        let rendered = filter.substitute_string(&package, true, false, "installed {name} {version}");
        assert_eq!(rendered, "installed foo 1.2");
    }
}

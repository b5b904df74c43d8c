// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Post-install messaging (§4.6) and external-tags emission (§4.1 step
//! 3). Filter evaluation and template substitution are external
//! collaborators (§9); this module only sequences the two injected
//! bindings and the indentation/tinting rule.

use std::collections::HashSet;

use crate::package::Package;

/// One manifest-declared post-install message: a template and the filter
/// that gates whether it is shown.
#[derive(Debug, Clone)]
pub struct PostMessage {
    pub template: String,
    pub filter: String,
}

/// The external filter-language evaluator (§9 "Filter evaluation").
pub trait FilterEvaluator {
    fn eval_filter(&self, package: &Package, success: bool, failure: bool, filter: &str) -> bool;
    fn substitute_string(&self, package: &Package, success: bool, failure: bool, template: &str) -> String;
}

/// Looks up the manifest-declared post-install messages for a package;
/// the manifest format itself is an external collaborator's concern (§9).
pub trait ManifestAccessor {
    fn post_messages(&self, package: &Package) -> Vec<PostMessage>;

    /// Coarse OS-level dependency tag groups declared by `package`'s
    /// manifest (§9 "External tags"), e.g. a Debian-specific build-dep
    /// hint. Manifests that declare none return an empty vec.
    fn external_dependency_tags(&self, _package: &Package) -> Vec<TagGroup> {
        Vec::new()
    }
}

/// One group of coarse OS-level dependency tags a package declares.
/// Emitted as a unit — the union-intersection rule (§4.1 step 3) either
/// includes or excludes a whole group, never a partial one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub tags: Vec<String>,
}

impl TagGroup {
    /// A group is eligible for emission when its tag set is a subset of
    /// the configured tag set (§4.1 step 3's "union-intersection rule").
    fn is_subset_of(&self, configured: &HashSet<String>) -> bool {
        self.tags.iter().all(|tag| configured.contains(tag))
    }
}

/// Filters `groups` down to the ones eligible for emission under the
/// configured external-tags set.
pub fn select_external_tags<'a>(groups: &'a [TagGroup], configured: &HashSet<String>) -> Vec<&'a TagGroup> {
    groups.iter().filter(|group| group.is_subset_of(configured)).collect()
}

/// One rendered message, ready to print under a per-package header
/// tinted green on success or red on failure. Colouring itself is a CLI
/// concern (`tui::Styled`); this only decides the polarity.
pub struct RenderedMessage {
    pub package_header: String,
    pub body: String,
    pub success: bool,
}

/// Evaluates every `post_messages` entry for `package` and returns the
/// ones whose filter is satisfied, each substituted and indented
/// consistently with its leading marker.
pub fn render_post_install_messages(
    package: &Package,
    messages: &[PostMessage],
    failed: bool,
    evaluator: &dyn FilterEvaluator,
) -> Vec<RenderedMessage> {
    let success = !failed;

    messages
        .iter()
        .filter(|m| evaluator.eval_filter(package, success, failed, &m.filter))
        .map(|m| {
            let substituted = evaluator.substitute_string(package, success, failed, &m.template);
            RenderedMessage {
                package_header: package.to_string(),
                body: indent_continuation_lines(&substituted),
                success,
            }
        })
        .collect()
}

/// Every line after the first is indented to line up under the first
/// line's leading marker (e.g. "- ").
fn indent_continuation_lines(text: &str) -> String {
    let mut lines = text.lines();
    let Some(first) = lines.next() else {
        return String::new();
    };
    // Marker is the leading non-whitespace run plus one separating space
    // (e.g. "- ", "* "), defaulting to two spaces for markerless text.
    let marker_len = first.find(char::is_whitespace).map_or(2, |end| end + 1);
    let indent = " ".repeat(marker_len);

    std::iter::once(first.to_string())
        .chain(lines.map(|l| format!("{indent}{l}")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysEval;
    impl FilterEvaluator for AlwaysEval {
        fn eval_filter(&self, _package: &Package, success: bool, _failure: bool, filter: &str) -> bool {
            filter == "success" && success || filter == "failure"
        }
        fn substitute_string(&self, package: &Package, _success: bool, _failure: bool, template: &str) -> String {
            template.replace("{name}", package.name.as_str())
        }
    }

    #[test]
    fn only_matching_filter_renders() {
        let package = Package::new("foo", "1.0");
        let messages = vec![
            PostMessage {
                template: "welcome {name}".into(),
                filter: "success".into(),
            },
            PostMessage {
                template: "oops {name}".into(),
                filter: "failure".into(),
            },
        ];

        let rendered = render_post_install_messages(&package, &messages, false, &AlwaysEval);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].body, "welcome foo");
        assert!(rendered[0].success);
    }

    #[test]
    fn tag_group_subset_rule() {
        let configured: HashSet<String> = ["deb", "amd64"].into_iter().map(String::from).collect();

        let groups = vec![
            TagGroup {
                tags: vec!["deb".into()],
            },
            TagGroup {
                tags: vec!["deb".into(), "amd64".into()],
            },
            TagGroup {
                tags: vec!["deb".into(), "arm64".into()],
            },
        ];

        let selected = select_external_tags(&groups, &configured);
        assert_eq!(selected, vec![&groups[0], &groups[1]]);
    }
}

//! Scoping: which objects a rule set applies to
//!
//! Combines the target scope anchor, the skip-files wildcard filter,
//! and the skip-objects list. Skip conditions are folded by the
//! scanner since they need the rule evaluator.

use crate::engine::condition::Condition;
use crate::engine::method::MethodRegistry;
use crate::engine::rule::{RuleSet, TargetScope};
use crate::object::{kind_matches, ObjectProvider};
use regex::Regex;

/// A comma-separated wildcard filter, e.g. `*.png, icon_?.jpg`.
///
/// `*` matches any run of characters, `?` a single character; the
/// whole filter matches if any alternative matches somewhere in the
/// text, ignoring case. Alternatives are deliberately unanchored so
/// path-shaped patterns like `Assets/Raw/*` work as substring filters.
pub struct Wildcard {
    regex: Option<Regex>,
}

impl Wildcard {
    pub fn new(filter: &str) -> Self {
        let alternatives: Vec<String> = filter
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|pattern| regex::escape(pattern).replace("\\*", ".*").replace("\\?", "."))
            .collect();
        if alternatives.is_empty() {
            return Self { regex: None };
        }
        let joined = format!("(?i){}", alternatives.join("|"));
        // The pattern is built from escaped text, so compilation only
        // fails on pathological sizes.
        let regex = Regex::new(&joined).ok();
        Self { regex }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(false, |r| r.is_match(text))
    }
}

/// Path-based scope decisions for one rule set.
pub struct ScopeResolver<'a> {
    rule_set: &'a RuleSet,
    skip_filter: Wildcard,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(rule_set: &'a RuleSet) -> Self {
        Self {
            rule_set,
            skip_filter: Wildcard::new(&rule_set.skip_files_filter),
        }
    }

    /// Whether `path` falls inside the set's target scope.
    pub fn in_target_scope(&self, path: &str) -> bool {
        match self.rule_set.target_scope {
            TargetScope::SpecificObjects => self
                .rule_set
                .specific_objects
                .iter()
                .any(|o| o == path),
            TargetScope::Folder => parent_dir(path) == self.rule_set.anchor_dir(),
            TargetScope::DeepFolder => {
                let anchor = self.rule_set.anchor_dir();
                anchor.is_empty() || path.starts_with(&format!("{anchor}/"))
            }
        }
    }

    /// Whether `path` is exempted by the skip-files wildcard, matched
    /// against the full path.
    pub fn matches_skip_filter(&self, path: &str) -> bool {
        self.skip_filter.matches(path)
    }

    /// Whether `path` is exempted by the skip-objects list: an exact
    /// entry, or an entry that is a folder ancestor of the path.
    pub fn is_skipped_object(&self, path: &str) -> bool {
        self.rule_set
            .skip_objects
            .iter()
            .any(|skip| path == skip || path.starts_with(&format!("{skip}/")))
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Filter a rule's conditions down to the ones whose check resolves
/// and accepts the subject's kind. The relative order is preserved.
pub fn select_applicable<'c>(
    registry: &MethodRegistry,
    provider: &dyn ObjectProvider,
    subject_kind: &str,
    conditions: &'c [Condition],
) -> Vec<&'c Condition> {
    conditions
        .iter()
        .filter(|condition| {
            registry
                .resolve_check(&condition.method.name)
                .map_or(false, |entry| {
                    kind_matches(provider, subject_kind, &entry.signature.subject_kind)
                })
        })
        .collect()
}

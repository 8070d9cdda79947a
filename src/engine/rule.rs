//! Rule and rule set definitions
//!
//! A rule set is one JSON file of rules plus the scoping configuration
//! that decides which objects the rules run against. Rule sets are the
//! unit of loading, scheduling, and report ownership.

use crate::engine::condition::Condition;
use crate::engine::params::MethodCall;
use crate::report::LogType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// How a rule set picks its target objects, anchored at the directory
/// holding the rule set file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetScope {
    /// The anchor directory and everything below it.
    #[default]
    DeepFolder,
    /// Direct children of the anchor directory only.
    Folder,
    /// An explicit object list, ignoring the anchor.
    SpecificObjects,
}

/// One rule: an ordered condition list plus outcome configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Severity applied to logs when the rule evaluates to True.
    #[serde(default)]
    pub true_log_type: LogType,
    /// Severity applied to logs when the rule evaluates to False.
    #[serde(default = "default_false_log_type")]
    pub false_log_type: LogType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_method: Option<MethodCall>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fix_notice: String,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enable: true,
            conditions: Vec::new(),
            true_log_type: LogType::None,
            false_log_type: LogType::Warning,
            help_url: String::new(),
            fix_method: None,
            fix_notice: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_false_log_type() -> LogType {
    LogType::Warning
}

/// A loadable file of rules with its scoping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Path the set was loaded from; not part of the file itself.
    #[serde(skip)]
    pub source_path: String,
    #[serde(default = "default_true")]
    pub enable_rules: bool,
    /// Secondary sets run in a second pass over the objects the
    /// primary pass already collected.
    #[serde(default)]
    pub secondary_check: bool,
    #[serde(default)]
    pub target_scope: TargetScope,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_objects: Vec<String>,
    /// Context paths checks may consult, e.g. an allowed-roots list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_include_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_exclude_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_skip_conditions: bool,
    /// Wildcard filter naming files exempt from the whole set.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub skip_files_filter: String,
    /// Objects matching these conditions are exempt from the set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_conditions: Vec<Condition>,
    /// Exact paths (or folders, covering their contents) to exempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_objects: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            enable_rules: true,
            secondary_check: false,
            target_scope: TargetScope::DeepFolder,
            specific_objects: Vec::new(),
            default_include_paths: Vec::new(),
            default_exclude_paths: Vec::new(),
            enable_skip_conditions: true,
            skip_files_filter: String::new(),
            skip_conditions: Vec::new(),
            skip_objects: Vec::new(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("cannot read rule set {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse rule set {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RuleSet {
    /// Load a rule set from disk, remembering the source path and
    /// ordering each rule's conditions by non-increasing priority.
    /// The sort is stable so equal-priority conditions keep their
    /// authored order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut set: RuleSet =
            serde_json::from_str(&text).map_err(|source| RuleSetError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        set.source_path = path.to_string_lossy().replace('\\', "/");
        set.normalize();
        Ok(set)
    }

    /// Re-establish internal ordering after construction or edits.
    pub fn normalize(&mut self) {
        for rule in &mut self.rules {
            rule.conditions.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
    }

    /// Directory the target scope is anchored at.
    pub fn anchor_dir(&self) -> &str {
        match self.source_path.rfind('/') {
            Some(idx) => &self.source_path[..idx],
            None => "",
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RuleSetError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|source| RuleSetError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| RuleSetError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// A targets manifest: which roots to scan and where rules come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Targets {
    /// Root paths to scan.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Discover rule set files automatically instead of listing them.
    #[serde(default = "default_true")]
    pub auto_search_rules: bool,
    /// Restrict discovery to the target roots themselves.
    #[serde(default)]
    pub search_rules_in_target_range: bool,
    /// Explicit rule set files used when discovery is off.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_rules: Vec<String>,
}

impl Targets {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| RuleSetError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::params::{MethodCall, ParamBag};
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    #[test]
    fn test_conditions_sorted_by_priority_stable() {
        let mut set = RuleSet::default();
        let mut rule = Rule::new("ordering");
        for (priority, name) in [(0, "a"), (5, "b"), (5, "c"), (2, "d")] {
            rule.conditions.push(Condition {
                priority,
                method: MethodCall::new(name, ParamBag::new()),
                ..Condition::default()
            });
        }
        set.rules.push(rule);
        set.normalize();

        let names: Vec<&str> = set.rules[0]
            .conditions
            .iter()
            .map(|c| c.method.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_load_sets_source_path_and_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("my.rules.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{{ \"rules\": [] }}").unwrap();

        let set = RuleSet::load(&path).unwrap();
        assert!(set.source_path.ends_with("sub/my.rules.json"));
        assert!(set.anchor_dir().ends_with("sub"));
        assert!(set.enable_rules);
        assert!(set.enable_skip_conditions);
    }

    #[test]
    fn test_rule_defaults_from_minimal_json() {
        let json = r#"{ "rules": [ { "name": "bare" } ] }"#;
        let set: RuleSet = serde_json::from_str(json).unwrap();
        let rule = &set.rules[0];
        assert!(rule.enable);
        assert_eq!(rule.true_log_type, LogType::None);
        assert_eq!(rule.false_log_type, LogType::Warning);
        assert!(rule.fix_method.is_none());
    }

    #[test]
    fn test_parse_error_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.rules.json");
        std::fs::write(&path, "not json").unwrap();
        let err = RuleSet::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.rules.json"));
    }
}

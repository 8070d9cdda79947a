//! Findings produced by rule evaluation
//!
//! A report records one log line a rule emitted for one object, tagged
//! with the triage fields reviewers edit afterwards. Reports sharing a
//! group id came from the same evaluate call and are fixed atomically.

use crate::engine::params::MethodCall;
use crate::object::PingRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to a rule outcome's log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    /// Suppresses report emission for that outcome.
    #[default]
    None,
    Info,
    Warning,
    Error,
}

/// Reviewer triage status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Confirm,
    Fixing,
    Ignore,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Confirm => "Confirm",
            Status::Fixing => "Fixing",
            Status::Ignore => "Ignore",
        };
        f.write_str(name)
    }
}

/// Reviewer-assigned fix priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    High,
    Middle,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "High",
            Priority::Middle => "Middle",
            Priority::Low => "Low",
        };
        f.write_str(name)
    }
}

/// One finding: a single log line for a single object under a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Rule set file the owning rule came from.
    pub rule_owner: String,
    pub rule_name: String,
    pub object_path: String,
    /// Pinpointed object the log refers to, when the check named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingRef>,
    pub log: String,
    pub log_type: LogType,
    /// Ordering hint within the group; lower sorts first.
    #[serde(default)]
    pub log_order: i32,
    /// Present only for error findings with a configured fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_method: Option<MethodCall>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fix_notice: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_url: String,
    /// Evaluate-call cohort id; all members are fixed together.
    pub group: u32,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(default)]
    pub fix_result: bool,
}

impl Report {
    pub fn has_fix(&self) -> bool {
        self.fix_method.as_ref().map_or(false, |m| !m.is_empty())
    }
}

/// A persisted batch of reports with its creation stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSet {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub reports: Vec<Report>,
}

impl ReportSet {
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            created: Utc::now(),
            comment: String::new(),
            reports,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Group ids present, in first-appearance order.
    pub fn groups(&self) -> Vec<u32> {
        let mut seen = Vec::new();
        for report in &self.reports {
            if !seen.contains(&report.group) {
                seen.push(report.group);
            }
        }
        seen
    }

    pub fn reports_in_group(&self, group: u32) -> Vec<&Report> {
        self.reports.iter().filter(|r| r.group == group).collect()
    }
}

//! Conditions: configured check invocations and their tri-state outcome
//!
//! A condition names a check method, the payload to bind, a negation
//! flag, and the logic operator that joins it to the NEXT condition.
//! Evaluation degrades gracefully: an unresolvable method, a kind
//! mismatch, a rejected subject, or a binding failure all yield
//! Ignored rather than an error.

use crate::engine::method::MethodRegistry;
use crate::engine::params::{bind, MethodCall};
use crate::engine::rule::RuleSet;
use crate::object::{kind_matches, ObjectProvider, PingRef, Subject};
use serde::{Deserialize, Serialize};

/// Tri-state outcome of a condition or a whole rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    True,
    False,
    Ignored,
}

impl Verdict {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Verdict::True => Some(true),
            Verdict::False => Some(false),
            Verdict::Ignored => None,
        }
    }
}

/// Binary operator joining a condition to its successor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicOp {
    pub fn apply(self, lhs: bool, rhs: bool) -> bool {
        match self {
            LogicOp::And => lhs && rhs,
            LogicOp::Or => lhs || rhs,
        }
    }
}

/// One configured check invocation inside a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Conditions with equal priority form an evaluation block;
    /// blocks run in non-increasing priority order.
    #[serde(default)]
    pub priority: i32,
    pub method: MethodCall,
    #[serde(default)]
    pub negation: bool,
    /// Joins this condition's value to the next one in the block.
    #[serde(default)]
    pub logic_op: LogicOp,
}

/// A log line a check emitted, optionally pinpointing an object.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub text: String,
    pub order: i32,
    pub ping: Option<PingRef>,
}

/// Mutable evaluation context handed to check and fix bodies.
///
/// Carries the owning rule set (absent for skip-condition evaluation)
/// and collects the logs the body emits.
pub struct CheckContext<'a> {
    pub rules: Option<&'a RuleSet>,
    logs: Vec<LogEntry>,
}

impl<'a> CheckContext<'a> {
    pub fn new(rules: Option<&'a RuleSet>) -> Self {
        Self {
            rules,
            logs: Vec::new(),
        }
    }

    /// Record a log line for the current invocation.
    pub fn emit(&mut self, text: impl Into<String>, order: i32, ping: Option<PingRef>) {
        self.logs.push(LogEntry {
            text: text.into(),
            order,
            ping,
        });
    }

    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }
}

/// Evaluates single conditions against a subject.
pub struct ConditionEvaluator<'a> {
    pub registry: &'a MethodRegistry,
    pub provider: &'a dyn ObjectProvider,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(registry: &'a MethodRegistry, provider: &'a dyn ObjectProvider) -> Self {
        Self { registry, provider }
    }

    /// Run one condition. Returns the verdict and the logs the check
    /// emitted (empty when the verdict is Ignored).
    pub fn evaluate(
        &self,
        rules: Option<&RuleSet>,
        subject: &Subject,
        condition: &Condition,
    ) -> (Verdict, Vec<LogEntry>) {
        let entry = match self.registry.resolve_check(&condition.method.name) {
            Some(entry) => entry,
            None => {
                log::debug!("check method '{}' not registered", condition.method.name);
                return (Verdict::Ignored, Vec::new());
            }
        };
        if !kind_matches(self.provider, subject.kind, &entry.signature.subject_kind) {
            return (Verdict::Ignored, Vec::new());
        }
        if let Some(validator) = entry.signature.subject_validator {
            if !validator(subject) {
                return (Verdict::Ignored, Vec::new());
            }
        }
        let args = match bind(&condition.method.params, &entry.signature, &[]) {
            Ok(args) => args,
            Err(err) => {
                log::debug!(
                    "binding '{}' for {} failed: {err}",
                    condition.method.name,
                    subject.path
                );
                return (Verdict::Ignored, Vec::new());
            }
        };

        let mut ctx = CheckContext::new(rules);
        let mut value = (entry.func)(&mut ctx, subject, &args);
        if condition.negation {
            value = !value;
        }
        let verdict = if value { Verdict::True } else { Verdict::False };
        (verdict, ctx.take_logs())
    }
}

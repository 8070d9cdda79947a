//! Rule evaluator: folds condition verdicts into a rule outcome
//!
//! Conditions arrive sorted by non-increasing priority and are
//! partitioned into blocks of equal priority. Inside a block the
//! values combine left to right using each condition's declared
//! operator (the operator joins a condition to its successor), with
//! no short-circuiting so every check still runs and logs. A block's
//! last operator then joins the block to the next one.
//!
//! A block whose first condition is Ignored counts as True for the
//! fold; the rule as a whole is Ignored only when every block opened
//! that way. Ignored conditions later in a block are skipped outright.

use crate::engine::condition::{Condition, ConditionEvaluator, LogEntry, Verdict};
use crate::engine::rule::{Rule, RuleSet};
use crate::object::Subject;
use crate::report::{LogType, Report};

/// Evaluates whole rules and emits reports for their findings.
pub struct RuleEvaluator<'a> {
    conditions: ConditionEvaluator<'a>,
}

struct Fold {
    verdict: Verdict,
    true_logs: Vec<LogEntry>,
    false_logs: Vec<LogEntry>,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(conditions: ConditionEvaluator<'a>) -> Self {
        Self { conditions }
    }

    pub fn condition_evaluator(&self) -> &ConditionEvaluator<'a> {
        &self.conditions
    }

    /// Evaluate a rule against one subject, producing the verdict and
    /// the reports to file under `group`.
    ///
    /// `conditions` is the applicable subset of the rule's conditions,
    /// still in rule order; callers pre-filter for subject kind.
    pub fn evaluate(
        &self,
        rule_set: &RuleSet,
        rule: &Rule,
        subject: &Subject,
        conditions: &[&Condition],
        group: u32,
    ) -> (Verdict, Vec<Report>) {
        let fold = self.fold(Some(rule_set), subject, conditions);
        let reports = match fold.verdict {
            Verdict::Ignored => Vec::new(),
            Verdict::True => {
                Self::reports_from(rule_set, rule, subject, rule.true_log_type, fold.true_logs, group)
            }
            Verdict::False => Self::reports_from(
                rule_set,
                rule,
                subject,
                rule.false_log_type,
                fold.false_logs,
                group,
            ),
        };
        (fold.verdict, reports)
    }

    /// Fold conditions to a bare verdict, with report emission
    /// suppressed and no rule set in context. Used for skip
    /// conditions.
    pub fn evaluate_verdict(&self, subject: &Subject, conditions: &[&Condition]) -> Verdict {
        self.fold(None, subject, conditions).verdict
    }

    fn fold(
        &self,
        rules: Option<&RuleSet>,
        subject: &Subject,
        conditions: &[&Condition],
    ) -> Fold {
        let mut fold = Fold {
            verdict: Verdict::Ignored,
            true_logs: Vec::new(),
            false_logs: Vec::new(),
        };
        if conditions.is_empty() {
            return fold;
        }

        let mut block_count = 0u32;
        let mut ignored_blocks = 0u32;
        // Accumulated value across blocks and the operator joining the
        // next block onto it.
        let mut acc: Option<bool> = None;
        let mut acc_op = crate::engine::condition::LogicOp::And;

        let mut start = 0;
        while start < conditions.len() {
            let priority = conditions[start].priority;
            let mut end = start + 1;
            while end < conditions.len() && conditions[end].priority == priority {
                end += 1;
            }
            let block = &conditions[start..end];
            block_count += 1;

            // First condition opens the block.
            let (first_verdict, first_logs) =
                self.conditions.evaluate(rules, subject, block[0]);
            let mut block_value = match first_verdict {
                Verdict::Ignored => {
                    ignored_blocks += 1;
                    true
                }
                Verdict::True => {
                    fold.true_logs.extend(first_logs);
                    true
                }
                Verdict::False => {
                    fold.false_logs.extend(first_logs);
                    false
                }
            };
            // The operator that will join the NEXT condition on.
            let mut join_op = block[0].logic_op;

            for condition in &block[1..] {
                let (verdict, logs) = self.conditions.evaluate(rules, subject, condition);
                match verdict {
                    Verdict::Ignored => {}
                    Verdict::True => {
                        fold.true_logs.extend(logs);
                        block_value = join_op.apply(block_value, true);
                    }
                    Verdict::False => {
                        fold.false_logs.extend(logs);
                        block_value = join_op.apply(block_value, false);
                    }
                }
                // Always the immediately preceding condition's operator,
                // ignored or not.
                join_op = condition.logic_op;
            }

            acc = Some(match acc {
                None => block_value,
                Some(prev) => acc_op.apply(prev, block_value),
            });
            // Last condition's operator joins this block to the next.
            acc_op = block[block.len() - 1].logic_op;

            start = end;
        }

        if ignored_blocks == block_count {
            fold.verdict = Verdict::Ignored;
        } else {
            fold.verdict = match acc {
                Some(true) => Verdict::True,
                _ => Verdict::False,
            };
        }
        fold
    }

    fn reports_from(
        rule_set: &RuleSet,
        rule: &Rule,
        subject: &Subject,
        log_type: LogType,
        mut logs: Vec<LogEntry>,
        group: u32,
    ) -> Vec<Report> {
        if log_type == LogType::None {
            return Vec::new();
        }
        logs.sort_by_key(|entry| entry.order);
        logs.into_iter()
            .filter(|entry| !entry.text.is_empty())
            .map(|entry| {
                let mut report = Report {
                    rule_owner: rule_set.source_path.clone(),
                    rule_name: rule.name.clone(),
                    object_path: subject.path.to_string(),
                    ping: entry.ping,
                    log: entry.text,
                    log_type,
                    log_order: entry.order,
                    group,
                    ..Report::default()
                };
                // Fix metadata is only actionable on error findings.
                if log_type == LogType::Error {
                    report.fix_method = rule.fix_method.clone();
                    report.fix_notice = rule.fix_notice.clone();
                    report.help_url = rule.help_url.clone();
                }
                report
            })
            .collect()
    }
}

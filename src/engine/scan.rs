//! Scanner: schedules rule sets over object collections
//!
//! Runs in two passes. Primary rule sets walk their own target scope
//! and accumulate every object they touched; secondary rule sets then
//! re-filter that accumulated list through their own scope instead of
//! walking the tree again.

use crate::engine::condition::ConditionEvaluator;
use crate::engine::evaluator::RuleEvaluator;
use crate::engine::method::MethodRegistry;
use crate::engine::rule::RuleSet;
use crate::engine::scope::{select_applicable, ScopeResolver};
use crate::object::{ObjectProvider, Subject};
use crate::report::Report;

/// Called once per object examined.
pub type ProgressFn<'p> = dyn FnMut(usize, usize, &str) + 'p;

pub struct Scanner<'a> {
    registry: &'a MethodRegistry,
    provider: &'a dyn ObjectProvider,
    group_index: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a MethodRegistry, provider: &'a dyn ObjectProvider) -> Self {
        Self {
            registry,
            provider,
            group_index: 0,
        }
    }

    /// Run every enabled rule set and collect the reports.
    pub fn scan(&mut self, rule_sets: &[RuleSet]) -> Vec<Report> {
        self.scan_with_progress(rule_sets, &mut |_, _, _| {})
    }

    pub fn scan_with_progress(
        &mut self,
        rule_sets: &[RuleSet],
        progress: &mut ProgressFn<'_>,
    ) -> Vec<Report> {
        self.group_index = 0;
        let mut reports = Vec::new();
        let mut touched: Vec<String> = Vec::new();

        let primaries: Vec<&RuleSet> = rule_sets
            .iter()
            .filter(|s| s.enable_rules && !s.secondary_check)
            .collect();
        let secondaries: Vec<&RuleSet> = rule_sets
            .iter()
            .filter(|s| s.enable_rules && s.secondary_check)
            .collect();

        let mut units: Vec<(&RuleSet, Vec<String>)> = Vec::new();
        for set in primaries {
            units.push((set, self.candidates(set)));
        }
        let primary_total: usize = units.iter().map(|(_, c)| c.len()).sum();

        let mut done = 0usize;
        for (set, candidates) in units {
            let resolver = ScopeResolver::new(set);
            for path in candidates {
                done += 1;
                progress(done, primary_total, &path);
                if !touched.contains(&path) {
                    touched.push(path.clone());
                }
                self.check_object(set, &resolver, &path, &mut reports);
            }
        }

        for set in secondaries {
            let resolver = ScopeResolver::new(set);
            let total = touched.len();
            for (idx, path) in touched.iter().enumerate() {
                progress(idx + 1, total, path);
                if !resolver.in_target_scope(path) {
                    continue;
                }
                self.check_object(set, &resolver, path, &mut reports);
            }
        }

        reports
    }

    /// Objects a primary rule set examines, in provider order.
    fn candidates(&self, set: &RuleSet) -> Vec<String> {
        let resolver = ScopeResolver::new(set);
        match set.target_scope {
            crate::engine::rule::TargetScope::SpecificObjects => set.specific_objects.clone(),
            _ => self
                .provider
                .list(set.anchor_dir())
                .into_iter()
                .filter(|path| resolver.in_target_scope(path))
                .collect(),
        }
    }

    fn check_object(
        &mut self,
        set: &RuleSet,
        resolver: &ScopeResolver<'_>,
        path: &str,
        reports: &mut Vec<Report>,
    ) {
        // The master toggle gates every exemption mechanism at once.
        if set.enable_skip_conditions
            && (resolver.matches_skip_filter(path) || resolver.is_skipped_object(path))
        {
            return;
        }
        let loaded = match self.provider.load(path) {
            Some(loaded) => loaded,
            None => {
                log::warn!("cannot load object at {path}");
                return;
            }
        };
        let subject = Subject::new(path, &loaded);
        let evaluator = RuleEvaluator::new(ConditionEvaluator::new(self.registry, self.provider));

        if set.enable_skip_conditions && !set.skip_conditions.is_empty() {
            let applicable =
                select_applicable(self.registry, self.provider, subject.kind, &set.skip_conditions);
            if !applicable.is_empty()
                && evaluator.evaluate_verdict(&subject, &applicable)
                    == crate::engine::condition::Verdict::True
            {
                log::debug!("{path} exempted by skip conditions of {}", set.source_path);
                return;
            }
        }

        for rule in &set.rules {
            if !rule.enable {
                continue;
            }
            let applicable =
                select_applicable(self.registry, self.provider, subject.kind, &rule.conditions);
            if applicable.is_empty() {
                continue;
            }
            let group = self.group_index;
            self.group_index += 1;
            let (_, rule_reports) = evaluator.evaluate(set, rule, &subject, &applicable, group);
            reports.extend(rule_reports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::condition::{Condition, LogicOp};
    use crate::engine::method::{ParamSpec, Signature};
    use crate::engine::params::{MethodCall, ParamBag, ParamKind};
    use crate::engine::rule::{Rule, TargetScope};
    use crate::object::LoadedObject;
    use crate::report::LogType;
    use pretty_assertions::assert_eq;

    /// Fixed path list; every path loads as a unit File object.
    struct ListProvider {
        paths: Vec<String>,
    }

    impl ObjectProvider for ListProvider {
        fn load(&self, path: &str) -> Option<LoadedObject> {
            self.paths
                .iter()
                .any(|p| p == path)
                .then(|| LoadedObject::new("File", ()))
        }
        fn kind_of(&self, _path: &str) -> Option<String> {
            Some("File".into())
        }
        fn is_subkind(&self, _kind: &str, ancestor: &str) -> bool {
            ancestor == "Object"
        }
        fn is_folder(&self, _path: &str) -> bool {
            false
        }
        fn list(&self, root: &str) -> Vec<String> {
            self.paths
                .iter()
                .filter(|p| root.is_empty() || p.starts_with(&format!("{root}/")))
                .cloned()
                .collect()
        }
    }

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry.register_check(
            "name_contains",
            Signature::new("Object").with_param(ParamSpec::scalar("needle", ParamKind::Str)),
            |ctx, subject, args| {
                let needle = args[0].as_str().unwrap_or_default();
                let hit = subject.path.contains(needle);
                if hit {
                    ctx.emit(format!("{} contains {needle}", subject.path), 0, None);
                }
                hit
            },
        );
        registry
    }

    fn flag_rule(needle: &str) -> Rule {
        let mut rule = Rule::new(format!("flag {needle}"));
        rule.true_log_type = LogType::Error;
        rule.conditions.push(Condition {
            method: MethodCall::new(
                "name_contains",
                ParamBag::new().with_string(needle),
            ),
            logic_op: LogicOp::And,
            ..Condition::default()
        });
        rule
    }

    fn set(source: &str) -> RuleSet {
        RuleSet {
            source_path: source.into(),
            ..RuleSet::default()
        }
    }

    #[test]
    fn test_primary_scan_flags_matching_objects() {
        let provider = ListProvider {
            paths: vec!["assets/bad_tex.png".into(), "assets/good.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].object_path, "assets/bad_tex.png");
        assert_eq!(reports[0].rule_owner, "assets/my.rules.json");
    }

    #[test]
    fn test_group_ids_fresh_per_rule_object_pair() {
        let provider = ListProvider {
            paths: vec!["assets/bad_a.png".into(), "assets/bad_b.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set.clone()]);
        assert_eq!(reports.len(), 2);
        assert_ne!(reports[0].group, reports[1].group);

        // A new scan restarts group numbering.
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports[0].group, 0);
    }

    #[test]
    fn test_skip_objects_exempt_paths() {
        let provider = ListProvider {
            paths: vec!["assets/bad_a.png".into(), "assets/raw/bad_b.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.skip_objects = vec!["assets/raw".into()];
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].object_path, "assets/bad_a.png");
    }

    #[test]
    fn test_skip_conditions_exempt_matching_objects() {
        let provider = ListProvider {
            paths: vec!["assets/bad_legacy.png".into(), "assets/bad_new.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.skip_conditions.push(Condition {
            method: MethodCall::new(
                "name_contains",
                ParamBag::new().with_string("legacy"),
            ),
            ..Condition::default()
        });
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].object_path, "assets/bad_new.png");
    }

    #[test]
    fn test_disabled_exemptions_scan_everything() {
        let provider = ListProvider {
            paths: vec!["assets/bad_a.png".into(), "assets/raw/bad_b.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.enable_skip_conditions = false;
        rule_set.skip_objects = vec!["assets/raw".into()];
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_secondary_set_reuses_primary_object_list() {
        let provider = ListProvider {
            paths: vec!["assets/bad.png".into(), "elsewhere/bad.png".into()],
        };
        let registry = registry();
        let mut primary = set("assets/my.rules.json");
        primary.rules.push(flag_rule("bad"));
        // Secondary set anchored at the root sees only what the
        // primary pass touched, not elsewhere/.
        let mut secondary = set("wide.rules.json");
        secondary.secondary_check = true;
        secondary.rules.push(flag_rule("png"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[primary, secondary]);
        let png_hits: Vec<&str> = reports
            .iter()
            .filter(|r| r.rule_name == "flag png")
            .map(|r| r.object_path.as_str())
            .collect();
        assert_eq!(png_hits, vec!["assets/bad.png"]);
    }

    #[test]
    fn test_specific_objects_scope_uses_listed_paths() {
        let provider = ListProvider {
            paths: vec!["assets/bad_a.png".into(), "assets/bad_b.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.target_scope = TargetScope::SpecificObjects;
        rule_set.specific_objects = vec!["assets/bad_b.png".into()];
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        let reports = scanner.scan(&[rule_set]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].object_path, "assets/bad_b.png");
    }

    #[test]
    fn test_disabled_rule_set_is_inert() {
        let provider = ListProvider {
            paths: vec!["assets/bad.png".into()],
        };
        let registry = registry();
        let mut rule_set = set("assets/my.rules.json");
        rule_set.enable_rules = false;
        rule_set.rules.push(flag_rule("bad"));

        let mut scanner = Scanner::new(&registry, &provider);
        assert!(scanner.scan(&[rule_set]).is_empty());
    }
}

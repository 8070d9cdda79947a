//! Fix dispatch: applying a configured repair to a report group
//!
//! A group's reports all came from one rule evaluation on one object,
//! so the group is repaired atomically: the fix method runs once and
//! its result is stamped onto every member.

use crate::database::TriageDatabase;
use crate::engine::condition::CheckContext;
use crate::engine::method::MethodRegistry;
use crate::engine::params::bind;
use crate::object::{kind_matches, ObjectProvider, PingRef, Subject};
use crate::report::Report;

pub struct FixDispatcher<'a> {
    registry: &'a MethodRegistry,
    provider: &'a dyn ObjectProvider,
}

impl<'a> FixDispatcher<'a> {
    pub fn new(registry: &'a MethodRegistry, provider: &'a dyn ObjectProvider) -> Self {
        Self { registry, provider }
    }

    /// Run the group's fix once and stamp the result on every report.
    /// Returns whether the fix succeeded.
    pub fn fix(&self, group: &mut [Report]) -> bool {
        let result = self.run_fix(group);
        for report in group.iter_mut() {
            report.fix_result = result;
        }
        result
    }

    /// Like [`fix`](Self::fix), additionally forgetting the triage
    /// records of repaired reports.
    pub fn fix_and_update(&self, group: &mut [Report], db: &mut TriageDatabase) -> bool {
        let result = self.fix(group);
        if result {
            for report in group.iter() {
                if let Err(err) = db.remove(report) {
                    log::error!("cannot update triage database: {err}");
                }
            }
        }
        result
    }

    fn run_fix(&self, group: &[Report]) -> bool {
        let first = match group.first() {
            Some(first) => first,
            None => return false,
        };
        let call = match &first.fix_method {
            Some(call) if !call.is_empty() => call,
            _ => {
                log::error!("no fix method configured for rule '{}'", first.rule_name);
                return false;
            }
        };
        let entry = match self.registry.resolve_fix(&call.name) {
            Some(entry) => entry,
            None => {
                log::error!("fix method '{}' is not registered", call.name);
                return false;
            }
        };
        let loaded = match self.provider.load(&first.object_path) {
            Some(loaded) => loaded,
            None => {
                log::error!("cannot load object at {}", first.object_path);
                return false;
            }
        };
        let subject = Subject::new(&first.object_path, &loaded);
        if !kind_matches(self.provider, subject.kind, &entry.signature.subject_kind) {
            log::error!(
                "fix method '{}' expects a {} but {} is a {}",
                call.name,
                entry.signature.subject_kind,
                subject.path,
                subject.kind
            );
            return false;
        }
        if let Some(validator) = entry.signature.subject_validator {
            if !validator(&subject) {
                log::error!("object {} rejected by fix method '{}'", subject.path, call.name);
                return false;
            }
        }

        let pings = Self::collect_pings(group);
        let args = match bind(&call.params, &entry.signature, &pings) {
            Ok(args) => args,
            Err(err) => {
                log::error!("cannot bind fix method '{}': {err}", call.name);
                return false;
            }
        };

        let mut ctx = CheckContext::new(None);
        (entry.func)(&mut ctx, &subject, &args)
    }

    /// Non-empty pings of the group, deduplicated by content.
    fn collect_pings(group: &[Report]) -> Vec<PingRef> {
        let mut pings: Vec<PingRef> = Vec::new();
        for report in group {
            if let Some(ping) = &report.ping {
                if ping.is_empty() {
                    continue;
                }
                if !pings.iter().any(|p| p.content_equals(ping)) {
                    pings.push(ping.clone());
                }
            }
        }
        pings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::method::{ParamSpec, Signature};
    use crate::engine::params::{MethodCall, ParamBag, ParamKind};
    use crate::object::LoadedObject;
    use crate::report::{LogType, Status};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider;

    impl ObjectProvider for MockProvider {
        fn load(&self, path: &str) -> Option<LoadedObject> {
            (!path.contains("gone")).then(|| LoadedObject::new("File", ()))
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
        fn list(&self, _root: &str) -> Vec<String> {
            Vec::new()
        }
    }

    static INVOCATIONS: AtomicUsize = AtomicUsize::new(0);

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry.register_fix(
            "repair",
            Signature::new("Object")
                .with_param(ParamSpec::array("pingObjects", ParamKind::ObjectRef)),
            |_ctx, _subject, args| {
                INVOCATIONS.fetch_add(1, Ordering::SeqCst);
                // Succeeds when at least one ping was aggregated.
                !args[0].as_pings().unwrap().is_empty()
            },
        );
        registry
    }

    fn fixable(path: &str, log: &str, ping: Option<PingRef>) -> Report {
        Report {
            rule_owner: "assets/my.rules.json".into(),
            rule_name: "fixable".into(),
            object_path: path.into(),
            log: log.into(),
            log_type: LogType::Error,
            fix_method: Some(MethodCall::new("repair", ParamBag::new())),
            ping,
            ..Report::default()
        }
    }

    #[test]
    fn test_fix_runs_once_and_stamps_whole_group() {
        let registry = registry();
        let provider = MockProvider;
        let dispatcher = FixDispatcher::new(&registry, &provider);

        let ping = PingRef::to_asset("assets/dep.png");
        let mut group = vec![
            fixable("assets/a.png", "first", Some(ping.clone())),
            fixable("assets/a.png", "second", Some(ping.clone())),
        ];
        let before = INVOCATIONS.load(Ordering::SeqCst);
        assert!(dispatcher.fix(&mut group));
        assert_eq!(INVOCATIONS.load(Ordering::SeqCst), before + 1);
        assert!(group.iter().all(|r| r.fix_result));
    }

    #[test]
    fn test_pings_deduplicated_and_empty_dropped() {
        let ping = PingRef::to_asset("assets/dep.png");
        let group = vec![
            fixable("assets/a.png", "first", Some(ping.clone())),
            fixable("assets/a.png", "second", Some(ping.clone())),
            fixable("assets/a.png", "third", Some(PingRef::default())),
            fixable("assets/a.png", "fourth", None),
        ];
        let pings = FixDispatcher::collect_pings(&group);
        assert_eq!(pings.len(), 1);
        assert!(pings[0].content_equals(&ping));
    }

    #[test]
    fn test_missing_fix_method_fails() {
        let registry = registry();
        let provider = MockProvider;
        let dispatcher = FixDispatcher::new(&registry, &provider);
        let mut group = vec![Report {
            object_path: "assets/a.png".into(),
            log: "no fix".into(),
            ..Report::default()
        }];
        assert!(!dispatcher.fix(&mut group));
        assert!(!group[0].fix_result);
    }

    #[test]
    fn test_unloadable_object_fails() {
        let registry = registry();
        let provider = MockProvider;
        let dispatcher = FixDispatcher::new(&registry, &provider);
        let mut group = vec![fixable(
            "assets/gone.png",
            "x",
            Some(PingRef::to_asset("assets/dep.png")),
        )];
        assert!(!dispatcher.fix(&mut group));
    }

    #[test]
    fn test_successful_fix_forgets_triage_records() {
        let registry = registry();
        let provider = MockProvider;
        let dispatcher = FixDispatcher::new(&registry, &provider);

        let dir = tempfile::tempdir().unwrap();
        let mut db = TriageDatabase::open(dir.path().join("triage.json")).unwrap();
        let mut report = fixable("assets/a.png", "first", Some(PingRef::to_asset("assets/dep.png")));
        report.status = Status::Fixing;
        db.insert(&report).unwrap();

        let mut group = vec![report];
        assert!(dispatcher.fix_and_update(&mut group, &mut db));
        assert!(db.is_empty());
    }
}

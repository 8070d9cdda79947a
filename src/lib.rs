//! Clearance - rule-driven compliance engine for asset collections
//!
//! Rules live in JSON files next to the assets they govern. Each rule
//! is a list of conditions naming registered check methods; the engine
//! binds their parameter payloads, folds the tri-state verdicts, and
//! turns the emitted logs into reports. Reviewer decisions persist in
//! a triage database and configured fixes repair findings in groups.
//!
//! # Example
//!
//! ```no_run
//! use clearance::checks::builtin_registry;
//! use clearance::engine::{RuleSet, Scanner};
//! use clearance::provider::FileProvider;
//!
//! let registry = builtin_registry(".");
//! let provider = FileProvider::new(".");
//! let rule_set = RuleSet::load("assets/textures.rules.json").unwrap();
//!
//! let mut scanner = Scanner::new(&registry, &provider);
//! for report in scanner.scan(&[rule_set]) {
//!     println!("{}: {}", report.object_path, report.log);
//! }
//! ```

pub mod checks;
pub mod config;
pub mod database;
pub mod engine;
pub mod object;
pub mod output;
pub mod provider;
pub mod report;

// Re-export main types
pub use crate::config::Config;
pub use crate::database::{DatabaseError, TriageDatabase, TriageRecord};
pub use crate::engine::{
    Condition, FixDispatcher, LogicOp, MethodCall, MethodRegistry, ParamBag, ParamKind, Rule,
    RuleSet, Scanner, Targets, TargetScope, Verdict,
};
pub use crate::object::{LoadedObject, ObjectProvider, ObjectRef, PingRef, Subject};
pub use crate::output::{get_formatter, Formatter, OutputFormat};
pub use crate::provider::{FileMeta, FileProvider};
pub use crate::report::{LogType, Priority, Report, ReportSet, Status};

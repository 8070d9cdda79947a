//! Rule evaluation engine
//!
//! Rules are data: JSON rule sets name registered check methods and
//! feed them flattened parameter payloads. The engine binds payloads,
//! folds tri-state condition verdicts into rule outcomes, and turns
//! the emitted logs into reports.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Scanner                     │
//! │  ┌───────────┐   ┌───────────┐   ┌───────┐  │
//! │  │ Scope     │──▶│ Rule      │──▶│ Fix   │  │
//! │  │ Resolver  │   │ Evaluator │   │ Disp. │  │
//! │  └───────────┘   └─────┬─────┘   └───────┘  │
//! │                        ▼                     │
//! │              ┌──────────────────┐            │
//! │              │ MethodRegistry   │            │
//! │              └──────────────────┘            │
//! └──────────────────────────────────────────────┘
//! ```

pub mod condition;
pub mod evaluator;
pub mod fix;
pub mod method;
pub mod params;
pub mod rule;
pub mod scan;
pub mod scope;

pub use condition::{CheckContext, Condition, ConditionEvaluator, LogEntry, LogicOp, Verdict};
pub use evaluator::RuleEvaluator;
pub use fix::FixDispatcher;
pub use method::{MethodRegistry, ParamSpec, Signature};
pub use params::{bind, Arg, BindError, MethodCall, ParamBag, ParamKind};
pub use rule::{Rule, RuleSet, RuleSetError, Targets, TargetScope};
pub use scan::Scanner;
pub use scope::{select_applicable, ScopeResolver, Wildcard};

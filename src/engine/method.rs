//! Method registry: named check and fix functions with typed signatures
//!
//! Checks and fixes are plain functions registered under a name; rule
//! files refer to them by that name. A signature declares the subject
//! kind the function accepts plus the ordered parameter list the binder
//! feeds from a payload.

use crate::engine::condition::CheckContext;
use crate::engine::params::{Arg, ParamKind};
use crate::object::Subject;
use std::collections::HashMap;

/// Extra gate on the subject beyond its kind, e.g. "file is readable".
pub type SubjectValidator = fn(&Subject) -> bool;

/// Per-value gate on string parameters.
pub type StringValidator = fn(&str) -> bool;

/// One declared parameter of a check or fix.
#[derive(Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub is_array: bool,
    pub validator: Option<StringValidator>,
}

impl ParamSpec {
    pub fn scalar(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_array: false,
            validator: None,
        }
    }

    pub fn array(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_array: true,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: StringValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Declared shape of a check or fix function.
#[derive(Clone)]
pub struct Signature {
    /// Kind the subject must be, or a subkind of it.
    pub subject_kind: String,
    pub subject_validator: Option<SubjectValidator>,
    pub params: Vec<ParamSpec>,
}

impl Signature {
    pub fn new(subject_kind: impl Into<String>) -> Self {
        Self {
            subject_kind: subject_kind.into(),
            subject_validator: None,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_subject_validator(mut self, validator: SubjectValidator) -> Self {
        self.subject_validator = Some(validator);
        self
    }
}

/// A check body. Returns the raw truth value; negation and verdict
/// folding happen upstream.
pub type CheckFn = Box<dyn Fn(&mut CheckContext, &Subject, &[Arg]) -> bool + Send + Sync>;

/// A fix body. Returns whether the repair succeeded.
pub type FixFn = Box<dyn Fn(&mut CheckContext, &Subject, &[Arg]) -> bool + Send + Sync>;

pub struct CheckEntry {
    pub signature: Signature,
    pub func: CheckFn,
}

pub struct FixEntry {
    pub signature: Signature,
    pub func: FixFn,
}

/// Name-indexed catalog of checks and fixes.
#[derive(Default)]
pub struct MethodRegistry {
    checks: HashMap<String, CheckEntry>,
    fixes: HashMap<String, FixEntry>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_check(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(&mut CheckContext, &Subject, &[Arg]) -> bool + Send + Sync + 'static,
    ) {
        self.checks.insert(
            name.into(),
            CheckEntry {
                signature,
                func: Box::new(func),
            },
        );
    }

    pub fn register_fix(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(&mut CheckContext, &Subject, &[Arg]) -> bool + Send + Sync + 'static,
    ) {
        self.fixes.insert(
            name.into(),
            FixEntry {
                signature,
                func: Box::new(func),
            },
        );
    }

    pub fn resolve_check(&self, name: &str) -> Option<&CheckEntry> {
        self.checks.get(name)
    }

    pub fn resolve_fix(&self, name: &str) -> Option<&FixEntry> {
        self.fixes.get(name)
    }

    pub fn check_names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    pub fn fix_names(&self) -> impl Iterator<Item = &str> {
        self.fixes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::LoadedObject;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = MethodRegistry::new();
        registry.register_check(
            "always_true",
            Signature::new("Object"),
            |_ctx, _subject, _args| true,
        );
        assert!(registry.resolve_check("always_true").is_some());
        assert!(registry.resolve_check("missing").is_none());
        assert!(registry.resolve_fix("always_true").is_none());
    }

    #[test]
    fn test_invoke_registered_check() {
        let mut registry = MethodRegistry::new();
        registry.register_check(
            "path_is_lower",
            Signature::new("Object"),
            |_ctx, subject, _args| subject.path.chars().all(|c| !c.is_ascii_uppercase()),
        );

        let obj = LoadedObject::new("File", ());
        let subject = Subject::new("assets/tex.png", &obj);
        let entry = registry.resolve_check("path_is_lower").unwrap();
        let mut ctx = CheckContext::new(None);
        assert!((entry.func)(&mut ctx, &subject, &[]));
    }
}

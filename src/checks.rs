//! Builtin check and fix methods
//!
//! The catalog rule files can name out of the box. Domain-specific
//! catalogs register their own methods next to these.

use crate::engine::method::{MethodRegistry, ParamSpec, Signature};
use crate::engine::params::ParamKind;
use crate::engine::scope::Wildcard;
use crate::object::PingRef;
use crate::provider::FileMeta;
use std::path::{Path, PathBuf};

/// A registry pre-populated with the builtin methods. Fixes that touch
/// the filesystem resolve object paths against `base`, the same root
/// the file provider walks.
pub fn builtin_registry(base: impl Into<PathBuf>) -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    register_builtins(&mut registry, base.into());
    registry
}

pub fn register_builtins(registry: &mut MethodRegistry, base: PathBuf) {
    registry.register_check(
        "name_equals",
        Signature::new("Object").with_param(ParamSpec::scalar("name", ParamKind::Str)),
        |_ctx, subject, args| {
            let expected = args[0].as_str().unwrap_or_default();
            file_name(subject.path) == expected
        },
    );

    registry.register_check(
        "name_matches",
        Signature::new("Object").with_param(ParamSpec::scalar("pattern", ParamKind::Str)),
        |_ctx, subject, args| {
            let pattern = args[0].as_str().unwrap_or_default();
            Wildcard::new(pattern).matches(file_name(subject.path))
        },
    );

    registry.register_check(
        "path_contains",
        Signature::new("Object").with_param(ParamSpec::scalar("needle", ParamKind::Str)),
        |_ctx, subject, args| {
            let needle = args[0].as_str().unwrap_or_default();
            subject.path.contains(needle)
        },
    );

    registry.register_check(
        "extension_in",
        Signature::new("File").with_param(ParamSpec::array("extensions", ParamKind::Str)),
        |_ctx, subject, args| {
            let meta = match subject.downcast::<FileMeta>() {
                Some(meta) => meta,
                None => return false,
            };
            args[0]
                .as_str_array()
                .unwrap_or_default()
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(&meta.extension))
        },
    );

    registry.register_check(
        "size_under",
        Signature::new("File").with_param(ParamSpec::scalar("limitKb", ParamKind::Int)),
        |ctx, subject, args| {
            let meta = match subject.downcast::<FileMeta>() {
                Some(meta) => meta,
                None => return false,
            };
            let limit_kb = args[0].as_int().unwrap_or(0).max(0) as u64;
            let size_kb = meta.size.div_ceil(1024);
            if size_kb > limit_kb {
                ctx.emit(
                    format!("{} is {size_kb} KB, over the {limit_kb} KB limit", subject.path),
                    0,
                    Some(PingRef::to_asset(subject.path)),
                );
                return false;
            }
            true
        },
    );

    registry.register_check(
        "in_default_include_paths",
        Signature::new("Object"),
        |ctx, subject, _args| match ctx.rules {
            Some(rules) if !rules.default_include_paths.is_empty() => rules
                .default_include_paths
                .iter()
                .any(|root| subject.path == *root || subject.path.starts_with(&format!("{root}/"))),
            _ => true,
        },
    );

    registry.register_check(
        "in_default_exclude_paths",
        Signature::new("Object"),
        |ctx, subject, _args| match ctx.rules {
            Some(rules) => rules
                .default_exclude_paths
                .iter()
                .any(|root| subject.path == *root || subject.path.starts_with(&format!("{root}/"))),
            None => false,
        },
    );

    registry.register_check(
        "name_is_lowercase",
        Signature::new("Object"),
        |ctx, subject, _args| {
            let name = file_name(subject.path);
            if name.chars().any(|c| c.is_ascii_uppercase()) {
                ctx.emit(format!("{} has uppercase characters in its name", subject.path), 0, None);
                return false;
            }
            true
        },
    );

    registry.register_fix(
        "rename_to_lowercase",
        Signature::new("Object"),
        move |_ctx, subject, _args| {
            let name = file_name(subject.path);
            let lowered = name.to_lowercase();
            if lowered == name {
                return true;
            }
            let target = match subject.path.rfind('/') {
                Some(idx) => format!("{}/{lowered}", &subject.path[..idx]),
                None => lowered,
            };
            // Object paths are base-relative; resolve before touching disk.
            match std::fs::rename(resolve(&base, subject.path), resolve(&base, &target)) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("cannot rename {}: {err}", subject.path);
                    false
                }
            }
        },
    );
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn resolve(base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
}

//! Object provider seam and reference value types
//!
//! The engine never touches storage or asset semantics directly. An
//! [`ObjectProvider`] hands out opaque subjects and answers kind/ancestry
//! queries; [`PingRef`] is the content-compared descriptor that findings
//! and triage records carry across scans.

use serde::{Deserialize, Serialize};
use std::any::Any;

/// An object loaded by a provider: its kind name plus opaque payload.
pub struct LoadedObject {
    pub kind: String,
    pub data: Box<dyn Any>,
}

impl LoadedObject {
    pub fn new(kind: impl Into<String>, data: impl Any) -> Self {
        Self {
            kind: kind.into(),
            data: Box::new(data),
        }
    }
}

/// Borrowed view of one inspectable object, passed to check functions.
#[derive(Clone, Copy)]
pub struct Subject<'a> {
    /// Stable path/identifier of the object.
    pub path: &'a str,
    /// Runtime kind name, as reported by the provider.
    pub kind: &'a str,
    /// Provider-specific payload.
    pub data: &'a dyn Any,
}

impl<'a> Subject<'a> {
    pub fn new(path: &'a str, obj: &'a LoadedObject) -> Self {
        Self {
            path,
            kind: &obj.kind,
            data: obj.data.as_ref(),
        }
    }

    /// Downcast the payload to a concrete provider type.
    pub fn downcast<T: Any>(&self) -> Option<&'a T> {
        self.data.downcast_ref::<T>()
    }
}

/// Collaborator that resolves paths to subjects and answers kind queries.
pub trait ObjectProvider {
    /// Load the object at `path`, or `None` if it does not resolve.
    fn load(&self, path: &str) -> Option<LoadedObject>;

    /// Kind of the object at `path` without fully loading it.
    fn kind_of(&self, path: &str) -> Option<String>;

    /// Whether `kind` is a (strict or transitive) subkind of `ancestor`.
    fn is_subkind(&self, kind: &str, ancestor: &str) -> bool;

    /// Whether `path` names a folder-like container.
    fn is_folder(&self, path: &str) -> bool;

    /// Enumerate object paths contained under `root` (deep). A plain
    /// object enumerates as itself.
    fn list(&self, root: &str) -> Vec<String>;
}

/// Exact-or-subkind compatibility test used for subject parameters.
pub fn kind_matches(provider: &dyn ObjectProvider, kind: &str, expected: &str) -> bool {
    kind == expected || provider.is_subkind(kind, expected)
}

/// A reference-typed configuration value inside a parameter payload.
///
/// An empty path is the serialized form of "no object", mirroring the
/// source format's null sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub String);

impl ObjectRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

/// Descriptor of the specific sub-object that triggered a log line.
///
/// Compared by content, never by identity, so triage decisions survive
/// re-scans. Default field values mean "no reference".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRef {
    #[serde(default)]
    pub asset_path: String,
    #[serde(default)]
    pub sub_asset: bool,
    #[serde(default)]
    pub sub_asset_id: i64,
    #[serde(default)]
    pub referencer_path: String,
    #[serde(default)]
    pub referencer_id: i64,
}

impl PingRef {
    pub fn to_asset(path: impl Into<String>) -> Self {
        Self {
            asset_path: path.into(),
            ..Default::default()
        }
    }

    pub fn to_sub_asset(path: impl Into<String>, id: i64) -> Self {
        Self {
            asset_path: path.into(),
            sub_asset: true,
            sub_asset_id: id,
            ..Default::default()
        }
    }

    /// All fields at their defaults, i.e. equivalent to no reference.
    pub fn is_empty(&self) -> bool {
        self.asset_path.is_empty()
            && !self.sub_asset
            && self.sub_asset_id == 0
            && self.referencer_path.is_empty()
            && self.referencer_id == 0
    }

    pub fn content_equals(&self, other: &PingRef) -> bool {
        self.asset_path == other.asset_path
            && self.sub_asset == other.sub_asset
            && self.sub_asset_id == other.sub_asset_id
            && self.referencer_path == other.referencer_path
            && self.referencer_id == other.referencer_id
    }

    /// Display name for exports: a foreign path is shown verbatim, a
    /// sub-asset as `path#id`, otherwise the referencer path.
    pub fn display_name(&self, object_path: &str) -> String {
        if self.asset_path != object_path {
            return self.asset_path.clone();
        }
        if self.sub_asset {
            return format!("{}#{}", self.asset_path, self.sub_asset_id);
        }
        self.referencer_path.clone()
    }
}

/// Content equality over optional pings, with the explicit rule that an
/// absent reference equals a reference whose fields are all default.
pub fn ping_equals(a: Option<&PingRef>, b: Option<&PingRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.content_equals(b),
        (Some(p), None) | (None, Some(p)) => p.is_empty(),
        (None, None) => true,
    }
}

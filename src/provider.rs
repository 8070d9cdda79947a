//! Filesystem object provider
//!
//! Maps a directory tree onto the object model: folders have kind
//! `Folder`, files get their lowercased extension as kind (or `File`
//! when there is none), and every file kind is a subkind of `File`.
//! All paths are workspace-relative with forward slashes.

use crate::object::{LoadedObject, ObjectProvider};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Payload attached to loaded filesystem objects; checks downcast to
/// this to inspect the file.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub extension: String,
    pub is_folder: bool,
}

pub struct FileProvider {
    base: PathBuf,
    ignore: Option<Regex>,
}

// Hidden entries plus the engine's own file types.
const DEFAULT_IGNORE: &str = r"(^|/)\.|\.rules\.json$|\.clearance\.json$";

impl FileProvider {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            ignore: Regex::new(DEFAULT_IGNORE).ok(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn abs(&self, path: &str) -> PathBuf {
        self.base.join(path)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    fn ignored(&self, rel: &str) -> bool {
        self.ignore.as_ref().map_or(false, |r| r.is_match(rel))
    }

    /// Find rule set files (`*.rules.json`) under `root`.
    pub fn discover_rule_sets(&self, root: &str) -> Vec<String> {
        let start = if root.is_empty() {
            self.base.clone()
        } else {
            self.abs(root)
        };
        let mut found = Vec::new();
        for entry in WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = self.relative(entry.path()) {
                if rel.ends_with(".rules.json") {
                    found.push(rel);
                }
            }
        }
        found
    }
}

impl ObjectProvider for FileProvider {
    fn load(&self, path: &str) -> Option<LoadedObject> {
        let abs = self.abs(path);
        let metadata = std::fs::metadata(&abs).ok()?;
        let name = abs.file_name()?.to_string_lossy().to_string();
        let is_folder = metadata.is_dir();
        let extension = if is_folder {
            String::new()
        } else {
            abs.extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        };
        let kind = self.kind_of(path)?;
        Some(LoadedObject::new(
            kind,
            FileMeta {
                name,
                size: metadata.len(),
                extension,
                is_folder,
            },
        ))
    }

    fn kind_of(&self, path: &str) -> Option<String> {
        let abs = self.abs(path);
        let metadata = std::fs::metadata(&abs).ok()?;
        if metadata.is_dir() {
            return Some("Folder".into());
        }
        let ext = abs
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty());
        Some(ext.unwrap_or_else(|| "File".into()))
    }

    fn is_subkind(&self, kind: &str, ancestor: &str) -> bool {
        match ancestor {
            "Object" => true,
            "File" => kind != "Folder" && kind != "Object",
            _ => false,
        }
    }

    fn is_folder(&self, path: &str) -> bool {
        self.abs(path).is_dir()
    }

    fn list(&self, root: &str) -> Vec<String> {
        let start = if root.is_empty() {
            self.base.clone()
        } else {
            self.abs(root)
        };
        let mut paths = Vec::new();
        for entry in WalkDir::new(&start)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if let Some(rel) = self.relative(entry.path()) {
                if !self.ignored(&rel) {
                    paths.push(rel);
                }
            }
        }
        paths
    }
}

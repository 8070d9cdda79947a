//! Report artifacts: persisted scan results
//!
//! A scan writes its full report set to a JSON artifact so triage and
//! later fix runs operate on the same findings.

use super::Formatter;
use crate::report::ReportSet;
use chrono::Local;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot access report artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse report artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Timestamped default artifact file name, e.g.
/// `AssetReport_2026_08_28_14_05.json`.
pub fn default_artifact_name() -> String {
    Local::now().format("AssetReport_%Y_%m_%d_%H_%M.json").to_string()
}

pub fn save_artifact(set: &ReportSet, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(set).map_err(|source| ArtifactError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_artifact(path: impl AsRef<Path>) -> Result<ReportSet, ArtifactError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// JSON formatter, emitting the artifact representation.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, set: &ReportSet) -> String {
        serde_json::to_string_pretty(set).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{LogType, Report};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let set = ReportSet::new(vec![Report {
            rule_name: "Texture size".into(),
            object_path: "assets/tex.png".into(),
            log: "too big".into(),
            log_type: LogType::Error,
            group: 7,
            ..Report::default()
        }])
        .with_comment("nightly scan");

        save_artifact(&set, &path).unwrap();
        let back = load_artifact(&path).unwrap();
        assert_eq!(back.comment, "nightly scan");
        assert_eq!(back.reports, set.reports);
    }

    #[test]
    fn test_default_artifact_name_shape() {
        let name = default_artifact_name();
        assert!(name.starts_with("AssetReport_"));
        assert!(name.ends_with(".json"));
        // AssetReport_ + YYYY_MM_DD_HH_MM + .json
        assert_eq!(name.len(), "AssetReport_".len() + 16 + ".json".len());
    }

    #[test]
    fn test_missing_artifact_is_io_error() {
        let err = load_artifact("no/such/file.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}

//! Triage database: reviewer decisions that outlive a scan
//!
//! Scans regenerate reports from scratch, so the status, priority,
//! and note a reviewer assigned are stored here keyed by the finding's
//! identity and copied back onto matching reports of later scans.
//! Every mutation rewrites the whole file.

use crate::object::{ping_equals, PingRef};
use crate::report::{Priority, Report, Status};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot read triage database {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse triage database {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One remembered reviewer decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub rule_owner: String,
    pub rule_name: String,
    pub object_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingRef>,
    pub log: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl TriageRecord {
    pub fn from_report(report: &Report) -> Self {
        Self {
            rule_owner: report.rule_owner.clone(),
            rule_name: report.rule_name.clone(),
            object_path: report.object_path.clone(),
            ping: report.ping.clone(),
            log: report.log.clone(),
            status: report.status,
            priority: report.priority,
            note: report.note.clone(),
        }
    }

    /// Identity match against a report. Pings compare by content,
    /// with an absent ping equal to an empty one.
    pub fn key_equals(&self, report: &Report) -> bool {
        self.rule_owner == report.rule_owner
            && self.rule_name == report.rule_name
            && self.object_path == report.object_path
            && self.log == report.log
            && ping_equals(self.ping.as_ref(), report.ping.as_ref())
    }
}

/// The persistent record store.
#[derive(Debug, Default)]
pub struct TriageDatabase {
    path: PathBuf,
    records: Vec<TriageRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabaseFile {
    #[serde(default)]
    records: Vec<TriageRecord>,
}

impl TriageDatabase {
    /// Open the database at `path`; a missing file is an empty
    /// database that will be created on first save.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }
        let text = std::fs::read_to_string(&path).map_err(|source| DatabaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: DatabaseFile =
            serde_json::from_str(&text).map_err(|source| DatabaseError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path,
            records: file.records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TriageRecord] {
        &self.records
    }

    fn save(&self) -> Result<(), DatabaseError> {
        let file = DatabaseFile {
            records: self.records.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|source| DatabaseError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, text).map_err(|source| DatabaseError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Copy remembered decisions onto matching reports; reports with
    /// no record fall back to the defaults.
    pub fn sync(&self, reports: &mut [Report]) {
        for report in reports {
            match self.records.iter().find(|r| r.key_equals(report)) {
                Some(record) => {
                    report.status = record.status;
                    report.priority = record.priority;
                    report.note = record.note.clone();
                }
                None => {
                    report.status = Status::default();
                    report.priority = Priority::default();
                    report.note = String::new();
                }
            }
        }
    }

    /// Remember a report's decision, replacing the mutable fields of
    /// an existing record with the same key.
    pub fn insert(&mut self, report: &Report) -> Result<(), DatabaseError> {
        match self.records.iter_mut().find(|r| r.key_equals(report)) {
            Some(record) => {
                record.status = report.status;
                record.priority = report.priority;
                record.note = report.note.clone();
            }
            None => self.records.push(TriageRecord::from_report(report)),
        }
        self.save()
    }

    /// Drop every record matching the report's key.
    pub fn remove(&mut self, report: &Report) -> Result<(), DatabaseError> {
        self.records.retain(|r| !r.key_equals(report));
        self.save()
    }
}

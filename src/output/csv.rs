//! CSV export of triaged reports
//!
//! One row per finding. Priority is only meaningful for findings a
//! reviewer marked Fixing, and the note column is filled for Fixing
//! and Ignore; other statuses leave those cells blank.

use super::Formatter;
use crate::report::{Report, ReportSet, Status};

const HEADER: &str = "Group,Status,Rules,Rule,AssetPath,PingObject,Log,Priority,Note";

#[derive(Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }

    fn row(report: &Report) -> Option<String> {
        // A finding with no log text carries no information.
        if report.log.is_empty() {
            return None;
        }
        let ping = report
            .ping
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| p.display_name(&report.object_path))
            .unwrap_or_default();
        let priority = match report.status {
            Status::Fixing => report.priority.to_string(),
            _ => String::new(),
        };
        let note = match report.status {
            Status::Fixing | Status::Ignore => report.note.clone(),
            Status::Confirm => String::new(),
        };
        let cells = [
            report.group.to_string(),
            report.status.to_string(),
            report.rule_owner.clone(),
            report.rule_name.clone(),
            report.object_path.clone(),
            ping,
            report.log.clone(),
            priority,
            note,
        ];
        Some(
            cells
                .iter()
                .map(|cell| escape(cell))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl Formatter for CsvFormatter {
    fn format(&self, set: &ReportSet) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for report in &set.reports {
            if let Some(row) = Self::row(report) {
                out.push_str(&row);
                out.push('\n');
            }
        }
        out
    }
}

/// RFC 4180 quoting: wrap in quotes when the cell contains a comma,
/// quote, or newline; double embedded quotes.
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{LogType, Priority};
    use pretty_assertions::assert_eq;

    fn report(log: &str, status: Status) -> Report {
        Report {
            rule_owner: "assets/my.rules.json".into(),
            rule_name: "Texture size".into(),
            object_path: "assets/tex.png".into(),
            log: log.into(),
            log_type: LogType::Error,
            status,
            ..Report::default()
        }
    }

    #[test]
    fn test_header_and_basic_row() {
        let set = ReportSet::new(vec![report("too big", Status::Confirm)]);
        let out = CsvFormatter::new().format(&set);
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Group,Status,Rules,Rule,AssetPath,PingObject,Log,Priority,Note"
        );
        assert_eq!(
            lines.next().unwrap(),
            "0,Confirm,assets/my.rules.json,Texture size,assets/tex.png,,too big,,"
        );
    }

    #[test]
    fn test_empty_log_row_skipped() {
        let set = ReportSet::new(vec![report("", Status::Confirm), report("kept", Status::Confirm)]);
        let out = CsvFormatter::new().format(&set);
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_priority_only_for_fixing_note_for_fixing_and_ignore() {
        let mut fixing = report("a", Status::Fixing);
        fixing.priority = Priority::Low;
        fixing.note = "later".into();
        let mut ignored = report("b", Status::Ignore);
        ignored.priority = Priority::Low;
        ignored.note = "vendor".into();
        let mut confirmed = report("c", Status::Confirm);
        confirmed.note = "hidden".into();

        let set = ReportSet::new(vec![fixing, ignored, confirmed]);
        let out = CsvFormatter::new().format(&set);
        let lines: Vec<&str> = out.lines().skip(1).collect();
        assert!(lines[0].ends_with(",a,Low,later"));
        assert!(lines[1].ends_with(",b,,vendor"));
        assert!(lines[2].ends_with(",c,,"));
    }

    #[test]
    fn test_cells_with_commas_and_quotes_escaped() {
        let mut r = report("width, height exceed \"limit\"", Status::Confirm);
        r.rule_name = "size, strict".into();
        let set = ReportSet::new(vec![r]);
        let out = CsvFormatter::new().format(&set);
        assert!(out.contains("\"size, strict\""));
        assert!(out.contains("\"width, height exceed \"\"limit\"\"\""));
    }

    #[test]
    fn test_ping_column_uses_display_name() {
        let mut r = report("dep missing", Status::Confirm);
        r.ping = Some(crate::object::PingRef::to_asset("assets/dep.png"));
        let set = ReportSet::new(vec![r]);
        let out = CsvFormatter::new().format(&set);
        assert!(out.contains(",assets/dep.png,dep missing,"));
    }
}

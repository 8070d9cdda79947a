//! Human-readable text output formatter

use super::Formatter;
use crate::report::{LogType, Report, ReportSet};

/// Text formatter with optional color support
pub struct TextFormatter {
    colored: bool,
}

impl TextFormatter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn severity_prefix(&self, log_type: LogType) -> &'static str {
        match log_type {
            LogType::Error => "error",
            LogType::Warning => "warning",
            LogType::Info => "info",
            LogType::None => "hint",
        }
    }

    fn severity_color(&self, log_type: LogType) -> &'static str {
        if !self.colored {
            return "";
        }
        match log_type {
            LogType::Error => "\x1b[1;31m",   // Bold red
            LogType::Warning => "\x1b[1;33m", // Bold yellow
            LogType::Info => "\x1b[1;36m",    // Bold cyan
            LogType::None => "\x1b[2m",       // Dim
        }
    }

    fn reset(&self) -> &'static str {
        if self.colored {
            "\x1b[0m"
        } else {
            ""
        }
    }

    fn bold(&self) -> &'static str {
        if self.colored {
            "\x1b[1m"
        } else {
            ""
        }
    }

    fn dim(&self) -> &'static str {
        if self.colored {
            "\x1b[2m"
        } else {
            ""
        }
    }

    fn format_report(&self, report: &Report) -> String {
        let mut line = format!(
            "{}{}{}: {}{}{} [{}] {}",
            self.severity_color(report.log_type),
            self.severity_prefix(report.log_type),
            self.reset(),
            self.bold(),
            report.object_path,
            self.reset(),
            report.rule_name,
            report.log,
        );
        if let Some(ping) = report.ping.as_ref().filter(|p| !p.is_empty()) {
            line.push_str(&format!(
                " {}({}){}",
                self.dim(),
                ping.display_name(&report.object_path),
                self.reset()
            ));
        }
        line
    }
}

impl Formatter for TextFormatter {
    fn format(&self, set: &ReportSet) -> String {
        let mut output = String::new();
        let mut total_errors = 0;
        let mut total_warnings = 0;
        let mut total_info = 0;

        for report in &set.reports {
            if report.log.is_empty() {
                continue;
            }
            output.push_str(&self.format_report(report));
            output.push('\n');

            match report.log_type {
                LogType::Error => total_errors += 1,
                LogType::Warning => total_warnings += 1,
                LogType::Info | LogType::None => total_info += 1,
            }
        }

        if total_errors > 0 || total_warnings > 0 || total_info > 0 {
            output.push('\n');
            let mut parts = Vec::new();
            if total_errors > 0 {
                parts.push(format!(
                    "{}{} error{}{}",
                    self.severity_color(LogType::Error),
                    total_errors,
                    if total_errors == 1 { "" } else { "s" },
                    self.reset()
                ));
            }
            if total_warnings > 0 {
                parts.push(format!(
                    "{}{} warning{}{}",
                    self.severity_color(LogType::Warning),
                    total_warnings,
                    if total_warnings == 1 { "" } else { "s" },
                    self.reset()
                ));
            }
            if total_info > 0 {
                parts.push(format!(
                    "{}{} info{}",
                    self.severity_color(LogType::Info),
                    total_info,
                    self.reset()
                ));
            }
            output.push_str(&format!("Found {}\n", parts.join(", ")));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(log_type: LogType, log: &str) -> Report {
        Report {
            rule_name: "Texture size".into(),
            object_path: "assets/tex.png".into(),
            log: log.into(),
            log_type,
            ..Report::default()
        }
    }

    #[test]
    fn test_plain_output_without_color() {
        let set = ReportSet::new(vec![report(LogType::Error, "too big")]);
        let out = TextFormatter::new(false).format(&set);
        assert!(out.starts_with("error: assets/tex.png [Texture size] too big"));
        assert!(out.contains("Found 1 error"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn test_summary_counts_and_plurals() {
        let set = ReportSet::new(vec![
            report(LogType::Error, "a"),
            report(LogType::Error, "b"),
            report(LogType::Warning, "c"),
        ]);
        let out = TextFormatter::new(false).format(&set);
        assert!(out.contains("Found 2 errors, 1 warning"));
    }

    #[test]
    fn test_empty_log_reports_skipped() {
        let set = ReportSet::new(vec![report(LogType::Error, "")]);
        let out = TextFormatter::new(false).format(&set);
        assert!(out.is_empty());
    }

    #[test]
    fn test_colored_output_has_escape_codes() {
        let set = ReportSet::new(vec![report(LogType::Warning, "x")]);
        let out = TextFormatter::new(true).format(&set);
        assert!(out.contains("\x1b[1;33m"));
        assert!(out.contains("\x1b[0m"));
    }
}

//! Clearance CLI

use clap::{Parser, Subcommand, ValueEnum};
use clearance::engine::{RuleSet, Scanner, Targets};
use clearance::output::{default_artifact_name, load_artifact, save_artifact};
use clearance::{
    checks::builtin_registry, get_formatter, Config, FixDispatcher, OutputFormat, Priority, Report,
    ReportSet, Status, TriageDatabase,
};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "clearance")]
#[command(about = "Rule-driven compliance engine - scan assets, triage findings, apply fixes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Base directory object paths are relative to
    #[arg(long, short = 'b', global = true, default_value = ".")]
    base: PathBuf,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan assets against rule sets and write a report artifact
    Scan {
        /// Targets manifest naming scan roots and rule discovery
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Explicit rule set files (skips discovery)
        #[arg(long)]
        rules: Vec<String>,

        /// Artifact path; defaults to a timestamped file in the
        /// configured reports directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output format for stdout
        #[arg(long, short = 'f', default_value = "text")]
        format: Format,
    },
    /// Apply configured fixes to report groups marked Fixing
    Fix {
        /// Report artifact to fix from
        #[arg(long, short = 'r')]
        report: PathBuf,

        /// Fix only these group ids (default: every Fixing group)
        #[arg(long)]
        group: Vec<u32>,
    },
    /// Export a report artifact as CSV
    ExportCsv {
        /// Report artifact to export
        #[arg(long, short = 'r')]
        report: PathBuf,

        /// CSV output path (stdout when omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Edit triage decisions on a report artifact
    Triage {
        #[command(subcommand)]
        action: TriageCommands,
    },
}

#[derive(Subcommand)]
enum TriageCommands {
    /// Set status, priority, and note on report groups
    Set {
        /// Report artifact to edit
        #[arg(long, short = 'r')]
        report: PathBuf,

        /// Group ids to edit
        #[arg(long, required = true)]
        group: Vec<u32>,

        #[arg(long, value_enum)]
        status: TriageStatus,

        #[arg(long, value_enum)]
        priority: Option<TriagePriority>,

        #[arg(long)]
        note: Option<String>,
    },
    /// Reset report groups to the default triage state
    Reset {
        /// Report artifact to edit
        #[arg(long, short = 'r')]
        report: PathBuf,

        /// Group ids to reset (default: all)
        #[arg(long)]
        group: Vec<u32>,
    },
}

#[derive(Clone, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum TriageStatus {
    Confirm,
    Fixing,
    Ignore,
}

impl From<TriageStatus> for Status {
    fn from(value: TriageStatus) -> Self {
        match value {
            TriageStatus::Confirm => Status::Confirm,
            TriageStatus::Fixing => Status::Fixing,
            TriageStatus::Ignore => Status::Ignore,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TriagePriority {
    High,
    Middle,
    Low,
}

impl From<TriagePriority> for Priority {
    fn from(value: TriagePriority) -> Self {
        match value {
            TriagePriority::High => Priority::High,
            TriagePriority::Middle => Priority::Middle,
            TriagePriority::Low => Priority::Low,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Scan {
            targets,
            rules,
            output,
            format,
        } => run_scan(&cli, targets.clone(), rules.clone(), output.clone(), format.clone()),
        Commands::Fix { report, group } => run_fix(&cli, report, group),
        Commands::ExportCsv { report, output } => run_export_csv(report, output.as_deref()),
        Commands::Triage { action } => match action {
            TriageCommands::Set {
                report,
                group,
                status,
                priority,
                note,
            } => run_triage_set(&cli, report, group, *status, *priority, note.clone()),
            TriageCommands::Reset { report, group } => run_triage_reset(&cli, report, group),
        },
    }
}

fn load_config(cli: &Cli) -> Config {
    if let Some(path) = &cli.config {
        match Config::load(path) {
            Ok(config) => return config,
            Err(e) => {
                eprintln!("Warning: {}", e);
            }
        }
    }
    Config::find_and_load(&cli.base).unwrap_or_default()
}

fn open_database(cli: &Cli, config: &Config) -> Result<TriageDatabase, ExitCode> {
    TriageDatabase::open(cli.base.join(&config.database_path)).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    })
}

/// Load a rule set through its base-relative path so target scopes
/// anchor correctly.
fn load_rule_set(base: &Path, rel: &str) -> Option<RuleSet> {
    match RuleSet::load(base.join(rel)) {
        Ok(mut set) => {
            set.source_path = rel.replace('\\', "/");
            Some(set)
        }
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    }
}

fn collect_rule_sets(
    cli: &Cli,
    targets: Option<PathBuf>,
    rules: Vec<String>,
) -> Result<Vec<RuleSet>, ExitCode> {
    let provider = clearance::FileProvider::new(&cli.base);

    if !rules.is_empty() {
        return Ok(rules
            .iter()
            .filter_map(|rel| load_rule_set(&cli.base, rel))
            .collect());
    }

    let rel_paths = match targets {
        Some(path) => {
            let manifest = match Targets::load(&path) {
                Ok(manifest) => manifest,
                Err(_) => {
                    println!("The targets path is invalid");
                    return Err(ExitCode::FAILURE);
                }
            };
            if manifest.auto_search_rules {
                if manifest.search_rules_in_target_range {
                    let mut found = Vec::new();
                    for root in &manifest.targets {
                        for rel in provider.discover_rule_sets(root) {
                            if !found.contains(&rel) {
                                found.push(rel);
                            }
                        }
                    }
                    found
                } else {
                    provider.discover_rule_sets("")
                }
            } else {
                manifest.override_rules
            }
        }
        None => provider.discover_rule_sets(""),
    };

    Ok(rel_paths
        .iter()
        .filter_map(|rel| load_rule_set(&cli.base, rel))
        .collect())
}

fn run_scan(
    cli: &Cli,
    targets: Option<PathBuf>,
    rules: Vec<String>,
    output: Option<PathBuf>,
    format: Format,
) -> ExitCode {
    let config = load_config(cli);
    let mut rule_sets = match collect_rule_sets(cli, targets, rules) {
        Ok(sets) => sets,
        Err(code) => return code,
    };
    if rule_sets.is_empty() {
        eprintln!("No rule sets found");
        return ExitCode::FAILURE;
    }
    for set in &mut rule_sets {
        set.rules.retain(|rule| config.is_rule_enabled(&rule.name));
    }

    if cli.verbose {
        eprintln!("Scanning with {} rule set(s)...", rule_sets.len());
    }

    let registry = builtin_registry(&cli.base);
    let provider = clearance::FileProvider::new(&cli.base);
    let mut scanner = Scanner::new(&registry, &provider);
    let mut reports = scanner.scan(&rule_sets);
    reports.retain(|r| !config.is_excluded(&r.object_path));

    let mut db = match open_database(cli, &config) {
        Ok(db) => db,
        Err(code) => return code,
    };
    db.sync(&mut reports);
    let has_errors = reports
        .iter()
        .any(|r| r.log_type == clearance::LogType::Error);
    let set = ReportSet::new(reports);

    let artifact_path = match output {
        Some(path) => path,
        None => {
            if config.reports_dir.is_empty() {
                println!("Undefined reports path");
                return ExitCode::FAILURE;
            }
            let dir = cli.base.join(&config.reports_dir);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                eprintln!("Error: cannot create {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
            dir.join(default_artifact_name())
        }
    };
    if let Err(e) = save_artifact(&set, &artifact_path) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let colored = !cli.no_color && std::io::stdout().is_terminal();
    let formatter = get_formatter(
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        },
        colored,
    );
    print!("{}", formatter.format(&set));
    println!("Reports created at \"{}\"", artifact_path.display());

    if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_fix(cli: &Cli, report_path: &Path, groups: &[u32]) -> ExitCode {
    let config = load_config(cli);
    let mut set = match load_artifact(report_path) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut db = match open_database(cli, &config) {
        Ok(db) => db,
        Err(code) => return code,
    };

    let registry = builtin_registry(&cli.base);
    let provider = clearance::FileProvider::new(&cli.base);
    let dispatcher = FixDispatcher::new(&registry, &provider);

    let mut attempted = 0usize;
    let mut fixed = 0usize;
    for group in set.groups() {
        if !groups.is_empty() && !groups.contains(&group) {
            continue;
        }
        let indexes: Vec<usize> = set
            .reports
            .iter()
            .enumerate()
            .filter(|(_, r)| r.group == group)
            .map(|(i, _)| i)
            .collect();
        let mut members: Vec<Report> = indexes.iter().map(|&i| set.reports[i].clone()).collect();
        let eligible = members
            .first()
            .map_or(false, |r| r.status == Status::Fixing && r.has_fix());
        if !eligible {
            continue;
        }
        attempted += 1;
        if dispatcher.fix_and_update(&mut members, &mut db) {
            fixed += 1;
        }
        apply_fix_results(&mut set.reports, &indexes, &members);
    }

    if let Err(e) = save_artifact(&set, report_path) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let colored = !cli.no_color && std::io::stdout().is_terminal();
    let summary = format!("Fixed {fixed} of {attempted} group(s)");
    if colored && fixed < attempted {
        println!("{}", summary.yellow());
    } else if colored {
        println!("{}", summary.green());
    } else {
        println!("{summary}");
    }

    if fixed == attempted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_export_csv(report_path: &Path, output: Option<&Path>) -> ExitCode {
    let set = match load_artifact(report_path) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let csv = get_formatter(OutputFormat::Csv, false).format(&set);
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, csv) {
                eprintln!("Error: cannot write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            println!("Reports created at \"{}\"", path.display());
        }
        None => print!("{csv}"),
    }
    ExitCode::SUCCESS
}

/// Copy stamped fix results back into the artifact by position, so
/// group members sharing the same log text each get their own slot.
fn apply_fix_results(reports: &mut [Report], indexes: &[usize], members: &[Report]) {
    for (&slot, member) in indexes.iter().zip(members) {
        reports[slot].fix_result = member.fix_result;
    }
}

fn edit_groups(
    cli: &Cli,
    report_path: &Path,
    groups: &[u32],
    edit: impl Fn(&mut Report),
    forget: bool,
) -> ExitCode {
    let config = load_config(cli);
    let mut set = match load_artifact(report_path) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut db = match open_database(cli, &config) {
        Ok(db) => db,
        Err(code) => return code,
    };

    let mut touched = 0usize;
    for report in &mut set.reports {
        if !groups.is_empty() && !groups.contains(&report.group) {
            continue;
        }
        edit(report);
        let result = if forget {
            db.remove(report)
        } else {
            db.insert(report)
        };
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        touched += 1;
    }

    if let Err(e) = save_artifact(&set, report_path) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    println!("Updated {touched} report(s)");
    ExitCode::SUCCESS
}

fn run_triage_set(
    cli: &Cli,
    report_path: &Path,
    groups: &[u32],
    status: TriageStatus,
    priority: Option<TriagePriority>,
    note: Option<String>,
) -> ExitCode {
    edit_groups(
        cli,
        report_path,
        groups,
        |report| {
            report.status = status.into();
            if let Some(priority) = priority {
                report.priority = priority.into();
            }
            if let Some(note) = &note {
                report.note = note.clone();
            }
        },
        false,
    )
}

fn run_triage_reset(cli: &Cli, report_path: &Path, groups: &[u32]) -> ExitCode {
    edit_groups(
        cli,
        report_path,
        groups,
        |report| {
            report.status = Status::default();
            report.priority = Priority::default();
            report.note = String::new();
        },
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(group: u32, log: &str) -> Report {
        Report {
            group,
            log: log.into(),
            ..Report::default()
        }
    }

    #[test]
    fn test_fix_results_stamp_duplicate_logs_per_slot() {
        let mut reports = vec![
            report(1, "oversized"),
            report(2, "oversized"),
            report(2, "oversized"),
        ];
        let indexes = vec![1, 2];
        let mut members = vec![reports[1].clone(), reports[2].clone()];
        for member in &mut members {
            member.fix_result = true;
        }
        apply_fix_results(&mut reports, &indexes, &members);
        assert_eq!(reports[0].fix_result, false);
        assert_eq!(reports[1].fix_result, true);
        assert_eq!(reports[2].fix_result, true);
    }
}

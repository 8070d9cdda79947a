//! Output formatters for report sets

mod artifact;
mod csv;
mod text;

pub use artifact::{default_artifact_name, load_artifact, save_artifact, ArtifactError};
pub use csv::CsvFormatter;
pub use text::TextFormatter;

use crate::report::ReportSet;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Trait for report formatters
pub trait Formatter {
    fn format(&self, set: &ReportSet) -> String;
}

/// Get a formatter for the specified format
pub fn get_formatter(format: OutputFormat, colored: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(colored)),
        OutputFormat::Csv => Box::new(CsvFormatter::new()),
        OutputFormat::Json => Box::new(artifact::JsonFormatter),
    }
}

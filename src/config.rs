//! Configuration handling for clearance

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = ".clearance.json";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Where the triage database lives
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory scan artifacts are written to
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,

    /// Rule name patterns to filter with
    #[serde(default)]
    pub rules: RulesConfig,

    /// File patterns to exclude from every scan
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_database_path() -> String {
    "clearance-db.json".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

/// Rule filtering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    /// Rules to enable (supports trailing wildcards like "Texture *")
    #[serde(default)]
    pub enable: Vec<String>,

    /// Rules to disable (supports wildcards)
    #[serde(default)]
    pub disable: Vec<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Find and load configuration from the current directory or parents
    pub fn find_and_load(start_dir: &Path) -> Option<Self> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Check if a rule should be enabled
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        // Check explicit disable first
        if matches_pattern(rule_name, &self.rules.disable) {
            return false;
        }

        // If enable list is empty, all rules are enabled by default
        if self.rules.enable.is_empty() {
            return true;
        }

        matches_pattern(rule_name, &self.rules.enable)
    }

    /// Check if an object path should be excluded from scans
    pub fn is_excluded(&self, path: &str) -> bool {
        for pattern in &self.exclude {
            if let Ok(glob) = glob::Pattern::new(pattern) {
                if glob.matches(path) {
                    return true;
                }
            }
        }
        false
    }
}

fn matches_pattern(name: &str, patterns: &[String]) -> bool {
    for pattern in patterns {
        if let Some(prefix) = pattern.strip_suffix('*') {
            if name.starts_with(prefix) {
                return true;
            }
        } else if pattern == name {
            return true;
        }
    }
    false
}

/// Configuration error
#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, String),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadError(path, msg) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    msg
                )
            }
            Self::ParseError(path, msg) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    msg
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.exclude.is_empty());
        assert!(config.is_rule_enabled("anything"));
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.database_path, "clearance-db.json");
        assert_eq!(config.reports_dir, "reports");
    }

    #[test]
    fn test_rule_disabled() {
        let mut config = Config::default();
        config.rules.disable.push("Texture size".to_string());
        assert!(!config.is_rule_enabled("Texture size"));
        assert!(config.is_rule_enabled("Texture format"));
    }

    #[test]
    fn test_rule_wildcard_disable() {
        let mut config = Config::default();
        config.rules.disable.push("Texture *".to_string());
        assert!(!config.is_rule_enabled("Texture size"));
        assert!(!config.is_rule_enabled("Texture format"));
        assert!(config.is_rule_enabled("Mesh density"));
    }

    #[test]
    fn test_rule_wildcard_enable() {
        let mut config = Config::default();
        config.rules.enable.push("Texture *".to_string());
        assert!(config.is_rule_enabled("Texture size"));
        assert!(!config.is_rule_enabled("Mesh density"));
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "databasePath": "tools/triage.json",
            "rules": {
                "disable": ["Mesh density"]
            },
            "exclude": ["**/vendor/**"]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.database_path, "tools/triage.json");
        assert!(!config.is_rule_enabled("Mesh density"));
        assert!(config.is_excluded("assets/vendor/tex.png"));
    }

    #[test]
    fn test_is_excluded() {
        let mut config = Config::default();
        config.exclude.push("**/generated/**".to_string());
        config.exclude.push("*.bak".to_string());

        assert!(config.is_excluded("assets/generated/tex.png"));
        assert!(config.is_excluded("tex.bak"));
        assert!(!config.is_excluded("assets/tex.png"));
    }

    #[test]
    fn test_config_error_display() {
        let read_err = ConfigError::ReadError(PathBuf::from("test.json"), "not found".to_string());
        assert!(read_err.to_string().contains("Failed to read"));
        assert!(read_err.to_string().contains("test.json"));

        let parse_err = ConfigError::ParseError(PathBuf::from("bad.json"), "invalid".to_string());
        assert!(parse_err.to_string().contains("Failed to parse"));
        assert!(parse_err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_find_and_load_found() {
        use std::fs::File;
        use std::io::Write;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".clearance.json");
        {
            let mut f = File::create(&config_path).unwrap();
            writeln!(f, r#"{{ "databasePath": "db.json" }}"#).unwrap();
        }

        let found = Config::find_and_load(temp_dir.path());
        assert!(found.is_some());
        assert_eq!(found.unwrap().database_path, "db.json");
    }

    #[test]
    fn test_find_and_load_not_found() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        // No config file in this directory
        let found = Config::find_and_load(temp_dir.path());
        assert!(found.is_none());
    }

    #[test]
    fn test_find_and_load_in_parent() {
        use std::fs::{self, File};
        use std::io::Write;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".clearance.json");
        {
            let mut f = File::create(&config_path).unwrap();
            writeln!(f, r#"{{ "reportsDir": "out" }}"#).unwrap();
        }

        // Create a subdirectory
        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        // Search from subdirectory should find parent's config
        let found = Config::find_and_load(&sub_dir);
        assert!(found.is_some());
        assert_eq!(found.unwrap().reports_dir, "out");
    }
}

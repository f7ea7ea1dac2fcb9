//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sbomdiff.toml` files.

use crate::inventory::IdentityStrategy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sbomdiff.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dependency-Track connection.
    #[serde(default)]
    pub dependency_track: DependencyTrackConfig,

    /// DefectDojo connection.
    #[serde(default)]
    pub defectdojo: DefectDojoConfig,

    /// Scanners to compare.
    #[serde(default)]
    pub scanners: ScannersConfig,

    /// Reconciliation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Plot output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of scanner projects fetched in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Write logs to this file instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
            log_file: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Dependency-Track API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyTrackConfig {
    /// Instance base URL, without the `/api` suffix.
    #[serde(default = "default_dt_url")]
    pub base_url: String,

    #[serde(default = "default_dt_api_version")]
    pub api_version: String,

    /// API key. Prefer the DEPENDENCY_TRACK_API_KEY env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Projects requested per page.
    #[serde(default = "default_dt_page_size")]
    pub page_size: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DependencyTrackConfig {
    fn default() -> Self {
        Self {
            base_url: default_dt_url(),
            api_version: default_dt_api_version(),
            api_key: None,
            verify_tls: true,
            page_size: default_dt_page_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_dt_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_dt_api_version() -> String {
    "v1".to_string()
}

fn default_dt_page_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// DefectDojo API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectDojoConfig {
    /// Instance base URL, without the `/api` suffix.
    #[serde(default = "default_dojo_url")]
    pub base_url: String,

    #[serde(default = "default_dojo_api_version")]
    pub api_version: String,

    /// API token. Prefer the DEFECT_DOJO_API_KEY env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Page size for list endpoints.
    #[serde(default = "default_dojo_page_size")]
    pub page_size: usize,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DefectDojoConfig {
    fn default() -> Self {
        Self {
            base_url: default_dojo_url(),
            api_version: default_dojo_api_version(),
            api_key: None,
            verify_tls: true,
            page_size: default_dojo_page_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_dojo_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_dojo_api_version() -> String {
    "v2".to_string()
}

fn default_dojo_page_size() -> usize {
    50
}

/// Scanner list and display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannersConfig {
    /// Scanner names in comparison order. Dependency-Track projects are
    /// expected to be named `<project>_<scanner>`.
    #[serde(default = "default_scanner_names")]
    pub names: Vec<String>,

    /// Human readable legend entry per scanner.
    #[serde(default = "default_scanner_legends")]
    pub legends: BTreeMap<String, String>,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        Self {
            names: default_scanner_names(),
            legends: default_scanner_legends(),
        }
    }
}

impl ScannersConfig {
    /// Legend for a scanner, falling back to its raw name.
    pub fn legend(&self, scanner: &str) -> String {
        self.legends
            .get(scanner)
            .cloned()
            .unwrap_or_else(|| scanner.to_string())
    }
}

fn default_scanner_names() -> Vec<String> {
    vec![
        "gitlab_cont",
        "jfrog_advanced_security_cont",
        "jfrog_cont",
        "syft_cont",
        "trivy_cont",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_scanner_legends() -> BTreeMap<String, String> {
    [
        ("gitlab_cont", "Gitlab"),
        ("jfrog_advanced_security_cont", "JFrog Advanced Security"),
        ("jfrog_cont", "JFrog Xray"),
        ("syft_cont", "Syft"),
        ("trivy_cont", "Trivy"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How component identities are matched across scanners.
    #[serde(default)]
    pub identity: IdentityStrategy,

    /// Scanners whose majority vote defines the ground truth.
    #[serde(default = "default_reference_scanners")]
    pub reference_scanners: Vec<String>,

    /// Minimum number of reference scanners that must agree.
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            identity: IdentityStrategy::default(),
            reference_scanners: default_reference_scanners(),
            vote_threshold: default_vote_threshold(),
        }
    }
}

fn default_reference_scanners() -> Vec<String> {
    vec!["gitlab_cont", "jfrog_advanced_security_cont", "syft_cont"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_vote_threshold() -> usize {
    2
}

/// Plot output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory; one sub-folder per project is created below it.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Plot width in pixels.
    #[serde(default = "default_plot_width")]
    pub plot_width: u32,

    /// Plot height in pixels.
    #[serde(default = "default_plot_height")]
    pub plot_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_plot_width() -> u32 {
    1000
}

fn default_plot_height() -> u32 {
    1200
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum artifacts listed per scanner pair difference.
    #[serde(default = "default_max_listed")]
    pub max_listed_artifacts: usize,

    /// Include the per-pair difference lists.
    #[serde(default = "default_true")]
    pub include_differences: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_listed_artifacts: default_max_listed(),
            include_differences: true,
        }
    }
}

fn default_max_listed() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually supplied override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.dt_url {
            self.dependency_track.base_url = url.clone();
        }
        if let Some(ref key) = args.dt_api_key {
            self.dependency_track.api_key = Some(key.clone());
        }
        if let Some(ref url) = args.dojo_url {
            self.defectdojo.base_url = url.clone();
        }
        if let Some(ref key) = args.dojo_api_key {
            self.defectdojo.api_key = Some(key.clone());
        }

        if args.insecure {
            self.dependency_track.verify_tls = false;
            self.defectdojo.verify_tls = false;
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(ref log_file) = args.log_file {
            self.general.log_file = Some(log_file.display().to_string());
        }

        if let Some(ref output_dir) = args.output_dir {
            self.output.dir = output_dir.display().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dependency_track.api_version, "v1");
        assert_eq!(config.defectdojo.page_size, 50);
        assert_eq!(config.scanners.names.len(), 5);
        assert_eq!(config.analysis.vote_threshold, 2);
        assert_eq!(config.analysis.identity, IdentityStrategy::NameVersion);
        assert!(config.dependency_track.verify_tls);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
concurrency = 2

[dependency_track]
base_url = "https://dtrack.example.com"
verify_tls = false

[scanners]
names = ["syft", "trivy", "grype"]

[analysis]
identity = "normalized"
reference_scanners = ["syft", "trivy", "grype"]
vote_threshold = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.dependency_track.base_url, "https://dtrack.example.com");
        assert!(!config.dependency_track.verify_tls);
        assert_eq!(config.dependency_track.api_version, "v1");
        assert_eq!(config.scanners.names, vec!["syft", "trivy", "grype"]);
        assert_eq!(config.analysis.identity, IdentityStrategy::Normalized);
        assert_eq!(config.analysis.vote_threshold, 3);
        assert_eq!(config.output.dir, "output");
    }

    #[test]
    fn test_scanner_legend_fallback() {
        let scanners = ScannersConfig::default();
        assert_eq!(scanners.legend("syft_cont"), "Syft");
        assert_eq!(scanners.legend("grype"), "grype");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[dependency_track]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(!toml_str.contains("api_key"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.scanners.names, Config::default().scanners.names);
    }
}

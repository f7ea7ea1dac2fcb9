//! Data models for the SBOM comparison.
//!
//! This module contains the core data structures shared by the API clients,
//! the reconciliation logic and the report generators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A Dependency-Track project (one per project/scanner combination).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub uuid: String,
}

/// A DefectDojo product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
}

/// A DefectDojo engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A DefectDojo test (one scan import inside an engagement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DojoTest {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub test_type: Option<u64>,
    #[serde(default)]
    pub test_type_name: Option<String>,
    #[serde(default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub engagement: Option<u64>,
}

impl DojoTest {
    /// Name of the scanner that produced this test.
    ///
    /// Prefers the scan type, then the test type name, then the title.
    pub fn scanner_name(&self) -> String {
        self.scan_type
            .as_deref()
            .or(self.test_type_name.as_deref())
            .or(self.title.as_deref())
            .map(String::from)
            .unwrap_or_else(|| format!("test_{}", self.id))
    }
}

/// A DefectDojo finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub component_name: Option<String>,
    #[serde(default)]
    pub component_version: Option<String>,
    #[serde(default)]
    pub cve: Option<String>,
    #[serde(default)]
    pub test: Option<u64>,
}

/// CycloneDX document as exported by Dependency-Track.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycloneDxBom {
    #[serde(default)]
    pub components: Option<Vec<CycloneDxComponent>>,
}

/// A single CycloneDX component. Only the fields used for reconciliation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycloneDxComponent {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default, rename = "bom-ref")]
    pub bom_ref: Option<String>,
    #[serde(default)]
    pub hashes: Option<Vec<CycloneDxHash>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycloneDxHash {
    pub alg: String,
    pub content: String,
}

/// One flattened component as reported by one scanner for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub project_name: String,
    pub project_version: Option<String>,
    pub scanner_name: String,
    pub project_uuid: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub purl: Option<String>,
    pub bom_ref: Option<String>,
    pub hash_algo: Option<String>,
    pub hash_sum: Option<String>,
    pub p_type: Option<String>,
    pub p_namespace: Option<String>,
    pub p_name: Option<String>,
    pub p_version: Option<String>,
    pub p_qualifiers: Option<String>,
    pub p_subpath: Option<String>,
    /// Identity key used to match this artifact across scanners.
    pub name_version: Option<String>,
    /// 1 if the scanner reported the artifact, 0 if it was filled in as missed.
    pub flag: Option<u8>,
    /// 1 if the reference scanners agree the artifact exists.
    pub label: Option<u8>,
}

impl ComponentRecord {
    /// Project name joined with its version, or the bare name without one.
    pub fn project_name_version(&self) -> String {
        project_name_version(&self.project_name, self.project_version.as_deref())
    }
}

/// Build the `name_version` string used for projects and output folders.
pub fn project_name_version(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{}_{}", name, v),
        None => name.to_string(),
    }
}

/// Where a dataset was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    DependencyTrack,
    DefectDojo,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::DependencyTrack => write!(f, "Dependency-Track"),
            DataSource::DefectDojo => write!(f, "DefectDojo"),
        }
    }
}

/// All component records of one project across its scanners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDataset {
    pub project_name: String,
    pub project_version: Option<String>,
    pub source: DataSource,
    pub collected_at: DateTime<Utc>,
    pub records: Vec<ComponentRecord>,
}

impl ScannerDataset {
    pub fn project_name_version(&self) -> String {
        project_name_version(&self.project_name, self.project_version.as_deref())
    }

    /// Scanner names in first-seen order.
    pub fn scanner_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            if !names.contains(&record.scanner_name) {
                names.push(record.scanner_name.clone());
            }
        }
        names
    }

    /// Number of components per scanner.
    pub fn component_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.scanner_name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Majority-vote verdict for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consensus {
    /// Enough reference scanners reported it ("TP").
    Confirmed,
    /// Too few reference scanners reported it ("FP").
    Unconfirmed,
}

impl Consensus {
    pub fn as_label(&self) -> u8 {
        match self {
            Consensus::Confirmed => 1,
            Consensus::Unconfirmed => 0,
        }
    }
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consensus::Confirmed => write!(f, "TP"),
            Consensus::Unconfirmed => write!(f, "FP"),
        }
    }
}

/// Whether a scanner reported an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    Positive,
    Negative,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Positive => write!(f, "P"),
            Prediction::Negative => write!(f, "N"),
        }
    }
}

/// A scanner's prediction scored against the consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    TruePositive,
    FalsePositive,
    FalseNegative,
    TrueNegative,
}

impl Outcome {
    pub fn evaluate(prediction: Prediction, consensus: Consensus) -> Self {
        match (prediction, consensus) {
            (Prediction::Positive, Consensus::Confirmed) => Outcome::TruePositive,
            (Prediction::Positive, Consensus::Unconfirmed) => Outcome::FalsePositive,
            (Prediction::Negative, Consensus::Confirmed) => Outcome::FalseNegative,
            (Prediction::Negative, Consensus::Unconfirmed) => Outcome::TrueNegative,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::TruePositive => write!(f, "TP"),
            Outcome::FalsePositive => write!(f, "FP"),
            Outcome::FalseNegative => write!(f, "FN"),
            Outcome::TrueNegative => write!(f, "TN"),
        }
    }
}

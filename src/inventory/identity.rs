//! Component identity keys.
//!
//! Scanners disagree on how they spell the same package. The identity key
//! decides which records count as the same artifact during reconciliation.

use crate::models::ComponentRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How records are matched across scanners.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityStrategy {
    /// `name@version` exactly as reported.
    #[default]
    NameVersion,
    /// Package URL without qualifiers or subpath.
    Purl,
    /// Lowercased package name with normalized separators and version.
    Normalized,
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityStrategy::NameVersion => write!(f, "name-version"),
            IdentityStrategy::Purl => write!(f, "purl"),
            IdentityStrategy::Normalized => write!(f, "normalized"),
        }
    }
}

impl IdentityStrategy {
    /// Compute the key for a record. Records without a version have none.
    pub fn key(&self, record: &ComponentRecord) -> Option<String> {
        let version = record.version.as_deref().filter(|v| !v.is_empty())?;

        match self {
            IdentityStrategy::NameVersion => Some(format!("{}@{}", record.name, version)),
            IdentityStrategy::Purl => Some(
                purl_key(record).unwrap_or_else(|| format!("{}@{}", record.name, version)),
            ),
            IdentityStrategy::Normalized => {
                let name = record.p_name.as_deref().unwrap_or(&record.name);
                Some(format!(
                    "{}@{}",
                    normalize_name(name),
                    normalize_version(version)
                ))
            }
        }
    }
}

/// Rebuild a PURL from its parsed parts, leaving out qualifiers and subpath.
fn purl_key(record: &ComponentRecord) -> Option<String> {
    let ty = record.p_type.as_deref()?;
    let name = record.p_name.as_deref()?;

    let mut key = format!("pkg:{}/", ty);
    if let Some(ns) = record.p_namespace.as_deref().filter(|ns| !ns.is_empty()) {
        key.push_str(ns);
        key.push('/');
    }
    key.push_str(name);

    let version = record.p_version.as_deref().or(record.version.as_deref())?;
    key.push('@');
    key.push_str(version);

    Some(key)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '.'], "-")
}

fn normalize_version(version: &str) -> String {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(version)
        .to_string()
}

/// Assign identity keys to every record in place.
pub fn assign_keys(records: &mut [ComponentRecord], strategy: IdentityStrategy) {
    for record in records.iter_mut() {
        record.name_version = strategy.key(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: Option<&str>) -> ComponentRecord {
        ComponentRecord {
            name: name.to_string(),
            version: version.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_version_key() {
        let rec = record("serde", Some("1.0.1"));
        assert_eq!(
            IdentityStrategy::NameVersion.key(&rec).as_deref(),
            Some("serde@1.0.1")
        );
    }

    #[test]
    fn test_missing_version_has_no_key() {
        assert_eq!(IdentityStrategy::NameVersion.key(&record("serde", None)), None);
        assert_eq!(IdentityStrategy::Normalized.key(&record("serde", Some(""))), None);
    }

    #[test]
    fn test_normalized_key_matches_spelling_variants() {
        let a = record("Jackson_Core", Some("v2.1"));
        let b = record("jackson-core", Some("2.1"));
        assert_eq!(
            IdentityStrategy::Normalized.key(&a),
            IdentityStrategy::Normalized.key(&b)
        );
    }

    #[test]
    fn test_normalized_key_maps_dots() {
        let a = record("ruamel.yaml", Some("0.17.21"));
        let b = record("ruamel_yaml", Some("0.17.21"));
        assert_eq!(
            IdentityStrategy::Normalized.key(&a).as_deref(),
            Some("ruamel-yaml@0.17.21")
        );
        assert_eq!(IdentityStrategy::Normalized.key(&a), IdentityStrategy::Normalized.key(&b));
    }

    #[test]
    fn test_normalized_keeps_non_numeric_v_prefix() {
        let rec = record("lib", Some("very-old"));
        assert_eq!(
            IdentityStrategy::Normalized.key(&rec).as_deref(),
            Some("lib@very-old")
        );
    }

    #[test]
    fn test_purl_key_drops_qualifiers() {
        let mut rec = record("jackson-core", Some("2.1"));
        rec.p_type = Some("maven".to_string());
        rec.p_namespace = Some("com.fasterxml.jackson.core".to_string());
        rec.p_name = Some("jackson-core".to_string());
        rec.p_version = Some("2.1".to_string());
        rec.p_qualifiers = Some("type=jar".to_string());

        assert_eq!(
            IdentityStrategy::Purl.key(&rec).as_deref(),
            Some("pkg:maven/com.fasterxml.jackson.core/jackson-core@2.1")
        );
    }

    #[test]
    fn test_purl_key_falls_back_to_name_version() {
        let rec = record("left-pad", Some("1.3.0"));
        assert_eq!(
            IdentityStrategy::Purl.key(&rec).as_deref(),
            Some("left-pad@1.3.0")
        );
    }
}

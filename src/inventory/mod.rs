//! Flattening of scanner output into component records.
//!
//! CycloneDX components and DefectDojo findings are both turned into
//! [`ComponentRecord`]s so the reconciliation code sees a single shape.

pub mod identity;

pub use identity::{assign_keys, IdentityStrategy};

use crate::models::{ComponentRecord, CycloneDxComponent, Finding};
use packageurl::PackageUrl;
use std::str::FromStr;
use tracing::warn;

/// Parsed parts of a package URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurlParts {
    pub ty: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub qualifiers: Option<String>,
    pub subpath: Option<String>,
}

/// Parse a PURL string. Invalid input yields empty parts and a warning.
pub fn parse_purl(purl: &str) -> PurlParts {
    match PackageUrl::from_str(purl) {
        Ok(parsed) => {
            let mut qualifiers: Vec<String> = parsed
                .qualifiers()
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            qualifiers.sort();

            PurlParts {
                ty: Some(parsed.ty().to_string()),
                namespace: parsed.namespace().map(String::from),
                name: Some(parsed.name().to_string()),
                version: parsed.version().map(String::from),
                qualifiers: if qualifiers.is_empty() {
                    None
                } else {
                    Some(qualifiers.join("&"))
                },
                subpath: parsed.subpath().map(String::from),
            }
        }
        Err(e) => {
            warn!("Error parsing PURL '{}': {}", purl, e);
            PurlParts::default()
        }
    }
}

/// Context shared by all records flattened from one scanner project.
#[derive(Debug, Clone)]
pub struct RecordContext<'a> {
    pub project_name: &'a str,
    pub project_version: Option<&'a str>,
    pub scanner_name: &'a str,
    pub project_uuid: Option<&'a str>,
}

impl RecordContext<'_> {
    fn base_record(&self, name: String, version: Option<String>) -> ComponentRecord {
        ComponentRecord {
            project_name: self.project_name.to_string(),
            project_version: self.project_version.map(String::from),
            scanner_name: self.scanner_name.to_string(),
            project_uuid: self.project_uuid.map(String::from),
            name,
            version,
            ..Default::default()
        }
    }
}

/// Flatten a CycloneDX component into a record.
pub fn flatten_component(ctx: &RecordContext<'_>, component: &CycloneDxComponent) -> ComponentRecord {
    let mut record = ctx.base_record(component.name.clone(), component.version.clone());
    record.purl = component.purl.clone();
    record.bom_ref = component.bom_ref.clone();

    if let Some(hash) = component.hashes.as_ref().and_then(|h| h.first()) {
        record.hash_algo = Some(hash.alg.clone());
        record.hash_sum = Some(hash.content.clone());
    }

    if let Some(purl) = component.purl.as_deref() {
        apply_purl(&mut record, parse_purl(purl));
    }

    record
}

/// Flatten a DefectDojo finding. Findings without a component are skipped.
pub fn flatten_finding(ctx: &RecordContext<'_>, finding: &Finding) -> Option<ComponentRecord> {
    let name = finding
        .component_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())?;

    Some(ctx.base_record(name.to_string(), finding.component_version.clone()))
}

fn apply_purl(record: &mut ComponentRecord, parts: PurlParts) {
    record.p_type = parts.ty;
    record.p_namespace = parts.namespace;
    record.p_name = parts.name;
    record.p_version = parts.version;
    record.p_qualifiers = parts.qualifiers;
    record.p_subpath = parts.subpath;
}

/// Flatten all components of one scanner project.
pub fn flatten_components(
    ctx: &RecordContext<'_>,
    components: &[CycloneDxComponent],
    strategy: IdentityStrategy,
) -> Vec<ComponentRecord> {
    let mut records: Vec<ComponentRecord> = components
        .iter()
        .map(|c| flatten_component(ctx, c))
        .collect();
    assign_keys(&mut records, strategy);
    records
}

/// Deduplicate findings into one record per component.
///
/// A scanner reports one finding per vulnerability, so the same component
/// shows up many times in DefectDojo.
pub fn flatten_findings(
    ctx: &RecordContext<'_>,
    findings: &[Finding],
    strategy: IdentityStrategy,
) -> Vec<ComponentRecord> {
    let mut records: Vec<ComponentRecord> = Vec::new();
    for finding in findings {
        if let Some(record) = flatten_finding(ctx, finding) {
            let duplicate = records
                .iter()
                .any(|r| r.name == record.name && r.version == record.version);
            if !duplicate {
                records.push(record);
            }
        }
    }
    assign_keys(&mut records, strategy);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CycloneDxHash;

    fn ctx() -> RecordContext<'static> {
        RecordContext {
            project_name: "shop",
            project_version: Some("2.0"),
            scanner_name: "syft_cont",
            project_uuid: Some("uuid-1"),
        }
    }

    #[test]
    fn test_parse_purl_components() {
        let parts = parse_purl("pkg:maven/org.apache.commons/commons-lang3@3.12.0?type=jar");
        assert_eq!(parts.ty.as_deref(), Some("maven"));
        assert_eq!(parts.namespace.as_deref(), Some("org.apache.commons"));
        assert_eq!(parts.name.as_deref(), Some("commons-lang3"));
        assert_eq!(parts.version.as_deref(), Some("3.12.0"));
        assert_eq!(parts.qualifiers.as_deref(), Some("type=jar"));
        assert_eq!(parts.subpath, None);
    }

    #[test]
    fn test_parse_invalid_purl_yields_empty_parts() {
        assert_eq!(parse_purl("not a purl"), PurlParts::default());
    }

    #[test]
    fn test_flatten_component_extracts_first_hash() {
        let component = CycloneDxComponent {
            name: "openssl".to_string(),
            version: Some("3.0.2".to_string()),
            purl: Some("pkg:deb/ubuntu/openssl@3.0.2".to_string()),
            bom_ref: Some("ref".to_string()),
            hashes: Some(vec![
                CycloneDxHash {
                    alg: "SHA-256".to_string(),
                    content: "abc".to_string(),
                },
                CycloneDxHash {
                    alg: "MD5".to_string(),
                    content: "def".to_string(),
                },
            ]),
        };

        let record = flatten_component(&ctx(), &component);
        assert_eq!(record.project_name, "shop");
        assert_eq!(record.project_version.as_deref(), Some("2.0"));
        assert_eq!(record.scanner_name, "syft_cont");
        assert_eq!(record.hash_algo.as_deref(), Some("SHA-256"));
        assert_eq!(record.hash_sum.as_deref(), Some("abc"));
        assert_eq!(record.p_type.as_deref(), Some("deb"));
        assert_eq!(record.p_namespace.as_deref(), Some("ubuntu"));
    }

    #[test]
    fn test_flatten_component_without_hashes_or_purl() {
        let component = CycloneDxComponent {
            name: "mystery".to_string(),
            hashes: Some(vec![]),
            ..Default::default()
        };
        let record = flatten_component(&ctx(), &component);
        assert_eq!(record.hash_algo, None);
        assert_eq!(record.hash_sum, None);
        assert_eq!(record.p_name, None);
    }

    #[test]
    fn test_flatten_components_assigns_keys() {
        let components = vec![
            CycloneDxComponent {
                name: "a".to_string(),
                version: Some("1".to_string()),
                ..Default::default()
            },
            CycloneDxComponent {
                name: "b".to_string(),
                ..Default::default()
            },
        ];
        let records = flatten_components(&ctx(), &components, IdentityStrategy::NameVersion);
        assert_eq!(records[0].name_version.as_deref(), Some("a@1"));
        assert_eq!(records[1].name_version, None);
    }

    #[test]
    fn test_flatten_findings_dedups_components() {
        let finding = |id: u64, component: Option<&str>| Finding {
            id,
            title: format!("CVE-{}", id),
            severity: Some("High".to_string()),
            component_name: component.map(String::from),
            component_version: Some("1.0".to_string()),
            cve: None,
            test: Some(1),
        };
        let findings = vec![
            finding(1, Some("log4j-core")),
            finding(2, Some("log4j-core")),
            finding(3, None),
            finding(4, Some("  ")),
            finding(5, Some("zlib")),
        ];

        let records = flatten_findings(&ctx(), &findings, IdentityStrategy::NameVersion);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name_version.as_deref(), Some("log4j-core@1.0"));
        assert_eq!(records[1].name, "zlib");
    }
}

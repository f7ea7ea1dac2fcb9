//! Row filters over component records.

use crate::models::ComponentRecord;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("'{0}' is not a column")]
    UnknownColumn(String),
}

/// Text columns that can be searched with [`filter_rows_with_string_in_column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ProjectName,
    ProjectVersion,
    ProjectNameVersion,
    ScannerName,
    ProjectUuid,
    Name,
    Version,
    NameVersion,
    Purl,
    BomRef,
    HashAlgo,
    HashSum,
    PurlType,
    PurlNamespace,
    PurlName,
    PurlVersion,
    PurlQualifiers,
    PurlSubpath,
}

impl FromStr for Column {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = match s {
            "project_name" => Column::ProjectName,
            "project_version" => Column::ProjectVersion,
            "project_name_version" => Column::ProjectNameVersion,
            "scanner_name" => Column::ScannerName,
            "project_uuid" => Column::ProjectUuid,
            "name" => Column::Name,
            "version" => Column::Version,
            "name_version" => Column::NameVersion,
            "purl" => Column::Purl,
            "bom_ref" | "bom-ref" => Column::BomRef,
            "hash_algo" => Column::HashAlgo,
            "hash_sum" => Column::HashSum,
            "p_type" => Column::PurlType,
            "p_namespace" => Column::PurlNamespace,
            "p_name" => Column::PurlName,
            "p_version" => Column::PurlVersion,
            "p_qualifiers" => Column::PurlQualifiers,
            "p_subpath" => Column::PurlSubpath,
            other => return Err(FilterError::UnknownColumn(other.to_string())),
        };
        Ok(column)
    }
}

impl Column {
    /// Value of this column for a record, if present.
    pub fn value(&self, record: &ComponentRecord) -> Option<String> {
        match self {
            Column::ProjectName => Some(record.project_name.clone()),
            Column::ProjectVersion => record.project_version.clone(),
            Column::ProjectNameVersion => Some(record.project_name_version()),
            Column::ScannerName => Some(record.scanner_name.clone()),
            Column::ProjectUuid => record.project_uuid.clone(),
            Column::Name => Some(record.name.clone()),
            Column::Version => record.version.clone(),
            Column::NameVersion => record.name_version.clone(),
            Column::Purl => record.purl.clone(),
            Column::BomRef => record.bom_ref.clone(),
            Column::HashAlgo => record.hash_algo.clone(),
            Column::HashSum => record.hash_sum.clone(),
            Column::PurlType => record.p_type.clone(),
            Column::PurlNamespace => record.p_namespace.clone(),
            Column::PurlName => record.p_name.clone(),
            Column::PurlVersion => record.p_version.clone(),
            Column::PurlQualifiers => record.p_qualifiers.clone(),
            Column::PurlSubpath => record.p_subpath.clone(),
        }
    }
}

/// Records belonging to the given project/version.
pub fn filter_by_project_name_version(
    records: &[ComponentRecord],
    project_name_version: &str,
) -> Vec<ComponentRecord> {
    records
        .iter()
        .filter(|r| r.project_name_version() == project_name_version)
        .cloned()
        .collect()
}

/// Records belonging to the given project/version and scanner.
pub fn filter_by_project_name_version_and_scanner(
    records: &[ComponentRecord],
    project_name_version: &str,
    scanner_name: &str,
) -> Vec<ComponentRecord> {
    records
        .iter()
        .filter(|r| {
            r.project_name_version() == project_name_version && r.scanner_name == scanner_name
        })
        .cloned()
        .collect()
}

/// Records with the given flag and label. Unevaluated records never match.
pub fn filter_by_flag_and_label(
    records: &[ComponentRecord],
    flag: u8,
    label: u8,
) -> Vec<ComponentRecord> {
    records
        .iter()
        .filter(|r| r.flag == Some(flag) && r.label == Some(label))
        .cloned()
        .collect()
}

/// Records whose `column` contains `needle`.
pub fn filter_rows_with_string_in_column(
    records: &[ComponentRecord],
    column: &str,
    needle: &str,
) -> Result<Vec<ComponentRecord>, FilterError> {
    let column: Column = column.parse()?;

    Ok(records
        .iter()
        .filter(|r| {
            column
                .value(r)
                .map(|value| value.contains(needle))
                .unwrap_or(false)
        })
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, version: Option<&str>, scanner: &str, name: &str) -> ComponentRecord {
        ComponentRecord {
            project_name: project.to_string(),
            project_version: version.map(String::from),
            scanner_name: scanner.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_by_project_name_version() {
        let records = vec![
            record("Project A", Some("v1"), "Scanner 1", "a"),
            record("Project B", Some("v1"), "Scanner 2", "b"),
            record("Project A", Some("v2"), "Scanner 1", "c"),
        ];

        let filtered = filter_by_project_name_version(&records, "Project A_v1");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
    }

    #[test]
    fn test_filter_by_project_without_version() {
        let records = vec![
            record("Project A", None, "Scanner 1", "a"),
            record("Project A", Some("v1"), "Scanner 1", "b"),
        ];
        let filtered = filter_by_project_name_version(&records, "Project A");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
    }

    #[test]
    fn test_filter_by_project_name_version_and_scanner() {
        let records = vec![
            record("Project A", Some("v1"), "Scanner 1", "a"),
            record("Project B", Some("v1"), "Scanner 2", "b"),
            record("Project A", Some("v1"), "Scanner 2", "c"),
        ];

        let filtered = filter_by_project_name_version_and_scanner(&records, "Project A_v1", "Scanner 1");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
    }

    #[test]
    fn test_filter_by_flag_and_label() {
        let mut records = vec![
            record("p", None, "s", "a"),
            record("p", None, "s", "b"),
            record("p", None, "s", "c"),
            record("p", None, "s", "unevaluated"),
        ];
        for (rec, (flag, label)) in records.iter_mut().zip([(1, 0), (2, 1), (1, 1)]) {
            rec.flag = Some(flag);
            rec.label = Some(label);
        }

        let filtered = filter_by_flag_and_label(&records, 1, 0);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");

        assert!(filter_by_flag_and_label(&records, 0, 0).is_empty());
    }

    #[test]
    fn test_filter_rows_with_string_in_column() {
        let mut records = vec![
            record("p", None, "s", "abc"),
            record("p", None, "s", "def"),
            record("p", None, "s", "ghi"),
        ];
        records[1].purl = Some("pkg:npm/def@1".to_string());

        let filtered = filter_rows_with_string_in_column(&records, "name", "d").unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "def");

        let by_purl = filter_rows_with_string_in_column(&records, "purl", "npm").unwrap();
        assert_eq!(by_purl.len(), 1);
    }

    #[test]
    fn test_filter_rows_by_purl_parts_and_uuid() {
        let mut records = vec![record("p", None, "s", "django"), record("p", None, "s", "flask")];
        records[0].project_uuid = Some("6a7f-uuid".to_string());
        records[0].p_version = Some("3.12.0".to_string());
        records[0].p_qualifiers = Some("arch=x86_64".to_string());
        records[0].p_subpath = Some("lib/core".to_string());
        records[1].p_version = Some("2.0.1".to_string());

        for (column, needle) in [
            ("project_uuid", "6a7f"),
            ("p_version", "3"),
            ("p_qualifiers", "arch="),
            ("p_subpath", "core"),
        ] {
            let filtered = filter_rows_with_string_in_column(&records, column, needle).unwrap();
            assert_eq!(filtered.len(), 1, "column {}", column);
            assert_eq!(filtered[0].name, "django");
        }

        // A known column that is empty on every record matches nothing.
        records[0].p_subpath = None;
        assert!(filter_rows_with_string_in_column(&records, "p_subpath", "core")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_filter_rows_unknown_column() {
        let records = vec![record("p", None, "s", "abc")];
        let err = filter_rows_with_string_in_column(&records, "colour", "x").unwrap_err();
        assert_eq!(err, FilterError::UnknownColumn("colour".to_string()));
        assert_eq!(err.to_string(), "'colour' is not a column");
    }
}

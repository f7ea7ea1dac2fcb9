//! Cross-scanner reconciliation.
//!
//! There is no ground truth for what a container really contains. The
//! reference scanners vote instead: an artifact reported by at least
//! `threshold` of them is treated as real, and every scanner is scored
//! against that verdict.

use super::filters::{filter_by_flag_and_label, filter_by_project_name_version_and_scanner};
use crate::models::{ComponentRecord, Consensus, Outcome, Prediction};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Majority-vote settings.
#[derive(Debug, Clone)]
pub struct LabelingRules {
    pub reference_scanners: Vec<String>,
    pub threshold: usize,
}

impl From<&crate::config::AnalysisConfig> for LabelingRules {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            reference_scanners: config.reference_scanners.clone(),
            threshold: config.vote_threshold,
        }
    }
}

impl LabelingRules {
    /// Settings that make the vote meaningless for the compared scanners.
    pub fn weaknesses(&self, scanners: &[String]) -> Vec<String> {
        let mut found = Vec::new();
        if self.threshold == 0 {
            found.push("vote threshold is 0, every artifact is confirmed".to_string());
        } else if self.threshold > self.reference_scanners.len() {
            found.push(format!(
                "vote threshold {} exceeds the {} reference scanners, no artifact can be confirmed",
                self.threshold,
                self.reference_scanners.len()
            ));
        }
        if !self.reference_scanners.iter().any(|r| scanners.contains(r)) {
            found.push(format!(
                "none of the reference scanners ({}) is compared, every artifact is unconfirmed",
                self.reference_scanners.join(", ")
            ));
        }
        found
    }
}

/// One artifact with its consensus and every scanner's verdict.
#[derive(Debug, Clone, Serialize)]
pub struct LabeledComponent {
    pub key: String,
    pub name: String,
    pub version: Option<String>,
    /// Number of reference scanners that reported the artifact.
    pub votes: usize,
    pub consensus: Consensus,
    pub predictions: BTreeMap<String, Prediction>,
    pub outcomes: BTreeMap<String, Outcome>,
}

/// Labeled artifacts of one project.
#[derive(Debug, Clone, Serialize)]
pub struct LabelTable {
    pub scanners: Vec<String>,
    pub rows: Vec<LabeledComponent>,
}

impl LabelTable {
    pub fn confirmed(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.consensus == Consensus::Confirmed)
            .count()
    }
}

/// Label every artifact seen by any of `scanners` by majority vote.
pub fn label_components(
    records: &[ComponentRecord],
    scanners: &[String],
    rules: &LabelingRules,
) -> LabelTable {
    let mut reported: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut first_seen: BTreeMap<&str, &ComponentRecord> = BTreeMap::new();

    for record in records {
        if !scanners.contains(&record.scanner_name) {
            continue;
        }
        let Some(key) = record.name_version.as_deref() else {
            continue;
        };
        reported
            .entry(key)
            .or_default()
            .insert(record.scanner_name.as_str());
        first_seen.entry(key).or_insert(record);
    }

    let rows: Vec<LabeledComponent> = reported
        .iter()
        .map(|(key, found_by)| {
            let votes = rules
                .reference_scanners
                .iter()
                .filter(|s| found_by.contains(s.as_str()))
                .count();
            let consensus = if votes >= rules.threshold {
                Consensus::Confirmed
            } else {
                Consensus::Unconfirmed
            };

            let mut predictions = BTreeMap::new();
            let mut outcomes = BTreeMap::new();
            for scanner in scanners {
                let prediction = if found_by.contains(scanner.as_str()) {
                    Prediction::Positive
                } else {
                    Prediction::Negative
                };
                predictions.insert(scanner.clone(), prediction);
                outcomes.insert(scanner.clone(), Outcome::evaluate(prediction, consensus));
            }

            let source = first_seen[key];
            LabeledComponent {
                key: key.to_string(),
                name: source.name.clone(),
                version: source.version.clone(),
                votes,
                consensus,
                predictions,
                outcomes,
            }
        })
        .collect();

    debug!(
        "Labeled {} artifacts across {} scanners",
        rows.len(),
        scanners.len()
    );

    LabelTable {
        scanners: scanners.to_vec(),
        rows,
    }
}

/// Complete each scanner's records with the artifacts it missed.
///
/// Records are grouped by project and version. Version-less records are
/// dropped. Reported artifacts get `flag = 1`, missed ones are appended with
/// `flag = 0`, and every row gets the majority-vote `label`.
pub fn complete_with_missing(
    records: &[ComponentRecord],
    rules: &LabelingRules,
) -> Vec<ComponentRecord> {
    let mut groups: BTreeMap<(String, Option<String>), Vec<&ComponentRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.project_name.clone(), record.project_version.clone()))
            .or_default()
            .push(record);
    }

    let mut completed = Vec::new();

    for ((project_name, project_version), group) in groups {
        info!(
            "Evaluating data for confusion matrix of project: {} - {}",
            project_name,
            project_version.as_deref().unwrap_or("None")
        );

        let kept: Vec<ComponentRecord> = group
            .into_iter()
            .filter(|r| r.version.is_some() && r.name_version.is_some())
            .cloned()
            .collect();

        let mut scanners: Vec<String> = Vec::new();
        for record in &kept {
            if !scanners.contains(&record.scanner_name) {
                scanners.push(record.scanner_name.clone());
            }
        }

        let table = label_components(&kept, &scanners, rules);
        let labels: BTreeMap<&str, &LabeledComponent> =
            table.rows.iter().map(|r| (r.key.as_str(), r)).collect();

        for scanner in &scanners {
            let mut seen: BTreeSet<String> = BTreeSet::new();

            for record in kept.iter().filter(|r| &r.scanner_name == scanner) {
                let Some(key) = record.name_version.clone() else {
                    continue;
                };
                if !seen.insert(key.clone()) {
                    continue;
                }
                let mut row = record.clone();
                row.flag = Some(1);
                row.label = labels.get(key.as_str()).map(|l| l.consensus.as_label());
                completed.push(row);
            }

            for (key, labeled) in &labels {
                if seen.contains(*key) {
                    continue;
                }
                completed.push(ComponentRecord {
                    project_name: project_name.clone(),
                    project_version: project_version.clone(),
                    scanner_name: scanner.clone(),
                    name: labeled.name.clone(),
                    version: labeled.version.clone(),
                    name_version: Some(key.to_string()),
                    flag: Some(0),
                    label: Some(labeled.consensus.as_label()),
                    ..Default::default()
                });
            }
        }
    }

    completed
}

/// Artifacts in `scanner_a`'s (flag, label) subset that `scanner_b`'s lacks.
pub fn difference_between_scanners(
    records: &[ComponentRecord],
    project_name_version: &str,
    scanner_a: &str,
    scanner_b: &str,
    flag: u8,
    label: u8,
) -> Vec<String> {
    let keys = |scanner: &str| -> BTreeSet<String> {
        let rows = filter_by_project_name_version_and_scanner(records, project_name_version, scanner);
        filter_by_flag_and_label(&rows, flag, label)
            .into_iter()
            .filter_map(|r| r.name_version)
            .collect()
    };

    let a = keys(scanner_a);
    let b = keys(scanner_b);
    a.difference(&b).cloned().collect()
}

/// Binary confusion matrix in scikit-learn layout:
/// rows are the actual label (false, true), columns the prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Count a scanner's completed records (label = actual, flag = predicted).
    pub fn from_records(records: &[ComponentRecord], scanner: &str) -> Self {
        let mut matrix = Self::default();
        for record in records.iter().filter(|r| r.scanner_name == scanner) {
            let (Some(label), Some(flag)) = (record.label, record.flag) else {
                continue;
            };
            match (label, flag) {
                (0, 0) => matrix.tn += 1,
                (0, _) => matrix.fp += 1,
                (_, 0) => matrix.fn_ += 1,
                _ => matrix.tp += 1,
            }
        }
        matrix
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn as_grid(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn f1(&self) -> Option<f64> {
        let p = self.precision()?;
        let r = self.recall()?;
        if p + r == 0.0 {
            None
        } else {
            Some(2.0 * p * r / (p + r))
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Confusion matrices of every scanner in completed records, first-seen order.
pub fn confusion_matrices(records: &[ComponentRecord]) -> Vec<(String, ConfusionMatrix)> {
    let mut scanners: Vec<&str> = Vec::new();
    for record in records {
        if !scanners.contains(&record.scanner_name.as_str()) {
            scanners.push(&record.scanner_name);
        }
    }

    scanners
        .into_iter()
        .map(|s| (s.to_string(), ConfusionMatrix::from_records(records, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(scanner: &str, name: &str, version: Option<&str>) -> ComponentRecord {
        ComponentRecord {
            project_name: "shop".to_string(),
            project_version: Some("2.0".to_string()),
            scanner_name: scanner.to_string(),
            name: name.to_string(),
            version: version.map(String::from),
            name_version: version.map(|v| format!("{}@{}", name, v)),
            ..Default::default()
        }
    }

    fn consensus_of(table: &LabelTable, key: &str) -> Option<Consensus> {
        table.rows.iter().find(|r| r.key == key).map(|r| r.consensus)
    }

    fn rules() -> LabelingRules {
        LabelingRules {
            reference_scanners: vec!["ref1".to_string(), "ref2".to_string(), "ref3".to_string()],
            threshold: 2,
        }
    }

    fn scanners() -> Vec<String> {
        ["ref1", "ref2", "ref3", "other"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_rule_weaknesses() {
        assert!(rules().weaknesses(&scanners()).is_empty());

        let zero = LabelingRules {
            threshold: 0,
            ..rules()
        };
        let found = zero.weaknesses(&scanners());
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("every artifact is confirmed"));

        let too_high = LabelingRules {
            threshold: 4,
            ..rules()
        };
        assert!(too_high.weaknesses(&scanners())[0].contains("exceeds the 3 reference scanners"));

        let dojo_scanners = vec!["Trivy Scan".to_string(), "Anchore Grype".to_string()];
        let found = rules().weaknesses(&dojo_scanners);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("none of the reference scanners"));
    }

    /// a: ref1, ref2, other -> confirmed
    /// b: ref1 only         -> unconfirmed
    /// c: other only        -> unconfirmed
    /// d: ref2, ref3        -> confirmed
    fn sample() -> Vec<ComponentRecord> {
        vec![
            record("ref1", "a", Some("1")),
            record("ref1", "b", Some("1")),
            record("ref2", "a", Some("1")),
            record("ref2", "d", Some("1")),
            record("ref3", "d", Some("1")),
            record("ref3", "nover", None),
            record("other", "a", Some("1")),
            record("other", "c", Some("1")),
        ]
    }

    #[test]
    fn test_label_components_majority_vote() {
        let table = label_components(&sample(), &scanners(), &rules());

        assert_eq!(table.rows.len(), 4);
        assert_eq!(consensus_of(&table, "a@1"), Some(Consensus::Confirmed));
        assert_eq!(consensus_of(&table, "b@1"), Some(Consensus::Unconfirmed));
        assert_eq!(consensus_of(&table, "c@1"), Some(Consensus::Unconfirmed));
        assert_eq!(consensus_of(&table, "d@1"), Some(Consensus::Confirmed));
        assert_eq!(table.confirmed(), 2);

        let a = &table.rows[0];
        assert_eq!(a.votes, 2);
        assert_eq!(a.predictions["other"], Prediction::Positive);
        assert_eq!(a.outcomes["ref3"], Outcome::FalseNegative);
    }

    #[test]
    fn test_label_table_outcomes() {
        let table = label_components(&sample(), &scanners(), &rules());
        let other: Vec<Outcome> = table.rows.iter().map(|r| r.outcomes["other"]).collect();
        assert_eq!(
            other,
            vec![
                Outcome::TruePositive,
                Outcome::TrueNegative,
                Outcome::FalsePositive,
                Outcome::FalseNegative,
            ]
        );
    }

    #[test]
    fn test_complete_with_missing_fills_gaps() {
        let completed = complete_with_missing(&sample(), &rules());

        // 4 scanners x 4 artifacts; the version-less record is dropped
        assert_eq!(completed.len(), 16);
        assert!(completed.iter().all(|r| r.version.is_some()));

        let ref3_a = completed
            .iter()
            .find(|r| r.scanner_name == "ref3" && r.name_version.as_deref() == Some("a@1"))
            .unwrap();
        assert_eq!(ref3_a.flag, Some(0));
        assert_eq!(ref3_a.label, Some(1));
        assert_eq!(ref3_a.project_version.as_deref(), Some("2.0"));

        let other_c = completed
            .iter()
            .find(|r| r.scanner_name == "other" && r.name_version.as_deref() == Some("c@1"))
            .unwrap();
        assert_eq!(other_c.flag, Some(1));
        assert_eq!(other_c.label, Some(0));
    }

    #[test]
    fn test_complete_with_missing_dedups_repeated_reports() {
        let mut records = sample();
        records.push(record("ref1", "a", Some("1")));
        let completed = complete_with_missing(&records, &rules());
        let count = completed
            .iter()
            .filter(|r| r.scanner_name == "ref1" && r.name_version.as_deref() == Some("a@1"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_complete_with_missing_groups_by_version() {
        let mut records = sample();
        let mut other_version = record("ref1", "z", Some("9"));
        other_version.project_version = Some("3.0".to_string());
        records.push(other_version);

        let completed = complete_with_missing(&records, &rules());
        let v3: Vec<_> = completed
            .iter()
            .filter(|r| r.project_version.as_deref() == Some("3.0"))
            .collect();
        assert_eq!(v3.len(), 1);
        assert_eq!(v3[0].label, Some(0));
    }

    #[test]
    fn test_confusion_matrix_from_completed_records() {
        let completed = complete_with_missing(&sample(), &rules());
        let matrices = confusion_matrices(&completed);

        assert_eq!(matrices.len(), 4);
        let (name, other) = &matrices[3];
        assert_eq!(name, "other");
        assert_eq!(other.as_grid(), [[1, 1], [1, 1]]);

        let ref2 = ConfusionMatrix::from_records(&completed, "ref2");
        // a TP, d TP, b TN, c TN
        assert_eq!(ref2, ConfusionMatrix { tn: 2, fp: 0, fn_: 0, tp: 2 });
        assert_eq!(ref2.precision(), Some(1.0));
        assert_eq!(ref2.recall(), Some(1.0));
        assert_eq!(ref2.f1(), Some(1.0));
    }

    #[test]
    fn test_confusion_matrix_metrics_zero_denominator() {
        let empty = ConfusionMatrix::default();
        assert_eq!(empty.precision(), None);
        assert_eq!(empty.recall(), None);
        assert_eq!(empty.accuracy(), None);
        assert_eq!(empty.f1(), None);

        let misses = ConfusionMatrix { tn: 0, fp: 2, fn_: 3, tp: 0 };
        assert_eq!(misses.precision(), Some(0.0));
        assert_eq!(misses.f1(), None);
    }

    #[test]
    fn test_difference_between_scanners() {
        let completed = complete_with_missing(&sample(), &rules());

        // confirmed artifacts ref2 reported that ref1 did not
        let diff = difference_between_scanners(&completed, "shop_2.0", "ref2", "ref1", 1, 1);
        assert_eq!(diff, vec!["d@1"]);

        // unconfirmed artifacts other reported that ref1 did not
        let diff = difference_between_scanners(&completed, "shop_2.0", "other", "ref1", 1, 0);
        assert_eq!(diff, vec!["c@1"]);

        let none = difference_between_scanners(&completed, "unknown", "ref2", "ref1", 1, 1);
        assert!(none.is_empty());
    }
}

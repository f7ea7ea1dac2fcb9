//! Comparison report generation.
//!
//! Builds a [`ComparisonReport`] from the records of one project version
//! and renders it as Markdown or JSON.

use crate::analysis::{
    complete_with_missing, confusion_matrices, difference_between_scanners, label_components,
    scanner_letter, ConfusionMatrix, LabelingRules, PairRegions, ScannerSets, TripleRegions,
};
use crate::inventory::IdentityStrategy;
use crate::models::{project_name_version, ComponentRecord, DataSource};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Report metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub project_name: String,
    pub project_version: Option<String>,
    pub source: DataSource,
    pub collected_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub identity: IdentityStrategy,
    pub scanners: Vec<String>,
    pub reference_scanners: Vec<String>,
    pub vote_threshold: usize,
}

impl ReportMetadata {
    pub fn project_name_version(&self) -> String {
        project_name_version(&self.project_name, self.project_version.as_deref())
    }
}

/// Per-scanner counts and scores.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerSummary {
    pub scanner: String,
    pub legend: String,
    pub letter: char,
    /// Component rows as reported, duplicates included.
    pub components: usize,
    /// Distinct identity keys.
    pub artifacts: usize,
    pub matrix: ConfusionMatrix,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Confirmed artifacts `left` reported and `right` did not.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerDifference {
    pub left: String,
    pub right: String,
    pub total: usize,
    /// At most `max_listed_artifacts` keys.
    pub artifacts: Vec<String>,
}

/// Majority-vote totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConsensusSummary {
    pub artifacts: usize,
    pub confirmed: usize,
    pub unconfirmed: usize,
}

/// Everything the report shows for one project version.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub metadata: ReportMetadata,
    pub consensus: ConsensusSummary,
    pub scanners: Vec<ScannerSummary>,
    pub pairs: Vec<PairRegions>,
    pub triple: Option<TripleRegions>,
    pub differences: Vec<ScannerDifference>,
    /// Plot files written next to the report.
    pub plots: Vec<String>,
}

/// Inputs for [`build_report`].
pub struct ReportInputs<'a> {
    pub project_name: &'a str,
    pub project_version: Option<&'a str>,
    pub source: DataSource,
    pub collected_at: DateTime<Utc>,
    pub records: &'a [ComponentRecord],
    pub scanners: &'a [String],
    pub legends: &'a [String],
    pub identity: IdentityStrategy,
    pub rules: &'a LabelingRules,
    pub max_listed: usize,
    pub include_differences: bool,
}

/// Pick the three scanners for the 3-way diagram: the reference scanners
/// when all of them are compared, otherwise the first three.
pub fn triple_scanners<'a>(scanners: &'a [String], reference: &'a [String]) -> Option<[&'a str; 3]> {
    if reference.len() == 3 && reference.iter().all(|r| scanners.contains(r)) {
        return Some([
            reference[0].as_str(),
            reference[1].as_str(),
            reference[2].as_str(),
        ]);
    }
    match scanners {
        [a, b, c, ..] => Some([a.as_str(), b.as_str(), c.as_str()]),
        _ => None,
    }
}

/// Reconcile the records and assemble the report.
pub fn build_report(inputs: &ReportInputs<'_>) -> ComparisonReport {
    let records: Vec<ComponentRecord> = inputs
        .records
        .iter()
        .filter(|r| inputs.scanners.contains(&r.scanner_name))
        .cloned()
        .collect();

    let sets = ScannerSets::from_records(&records, inputs.scanners);
    let table = label_components(&records, inputs.scanners, inputs.rules);
    let completed = complete_with_missing(&records, inputs.rules);
    let matrices = confusion_matrices(&completed);

    let consensus = ConsensusSummary {
        artifacts: table.rows.len(),
        confirmed: table.confirmed(),
        unconfirmed: table.rows.len() - table.confirmed(),
    };

    let scanners = inputs
        .scanners
        .iter()
        .enumerate()
        .map(|(i, scanner)| {
            let matrix = matrices
                .iter()
                .find(|(name, _)| name == scanner)
                .map(|(_, m)| *m)
                .unwrap_or_default();
            ScannerSummary {
                scanner: scanner.clone(),
                legend: inputs.legends.get(i).cloned().unwrap_or_else(|| scanner.clone()),
                letter: scanner_letter(i),
                components: records.iter().filter(|r| &r.scanner_name == scanner).count(),
                artifacts: sets.get(scanner).map(|s| s.len()).unwrap_or(0),
                precision: matrix.precision(),
                recall: matrix.recall(),
                f1: matrix.f1(),
                accuracy: matrix.accuracy(),
                matrix,
            }
        })
        .collect();

    let triple = triple_scanners(inputs.scanners, &inputs.rules.reference_scanners)
        .map(|[a, b, c]| sets.triple(a, b, c));

    let differences = if inputs.include_differences {
        collect_differences(&completed, inputs.scanners, inputs.max_listed)
    } else {
        Vec::new()
    };

    ComparisonReport {
        metadata: ReportMetadata {
            project_name: inputs.project_name.to_string(),
            project_version: inputs.project_version.map(String::from),
            source: inputs.source,
            collected_at: inputs.collected_at,
            generated_at: Utc::now(),
            identity: inputs.identity,
            scanners: inputs.scanners.to_vec(),
            reference_scanners: inputs.rules.reference_scanners.clone(),
            vote_threshold: inputs.rules.threshold,
        },
        consensus,
        scanners,
        pairs: sets.consecutive_pairs(),
        triple,
        differences,
        plots: Vec::new(),
    }
}

/// Confirmed-artifact differences for every consecutive pair, both ways.
fn collect_differences(
    completed: &[ComponentRecord],
    scanners: &[String],
    max_listed: usize,
) -> Vec<ScannerDifference> {
    let versions: BTreeSet<String> = completed.iter().map(|r| r.project_name_version()).collect();
    let mut differences = Vec::new();

    for pair in scanners.windows(2) {
        for (left, right) in [(&pair[0], &pair[1]), (&pair[1], &pair[0])] {
            let mut artifacts: Vec<String> = versions
                .iter()
                .flat_map(|pnv| difference_between_scanners(completed, pnv, left, right, 1, 1))
                .collect();
            artifacts.sort();
            artifacts.dedup();

            let total = artifacts.len();
            artifacts.truncate(max_listed);
            differences.push(ScannerDifference {
                left: left.clone(),
                right: right.clone(),
                total,
                artifacts,
            });
        }
    }

    differences
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ComparisonReport) -> String {
    let mut output = String::new();

    output.push_str("# SBOM Comparison Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(report));
    output.push_str(&generate_overlap_section(report));
    output.push_str(&generate_accuracy_section(&report.scanners));
    output.push_str(&generate_differences_section(&report.differences));
    output.push_str(&generate_plots_section(&report.plots));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Project:** {}\n", metadata.project_name));
    section.push_str(&format!(
        "- **Version:** {}\n",
        metadata.project_version.as_deref().unwrap_or("all versions")
    ));
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Collected:** {}\n",
        metadata.collected_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Identity:** `{}`\n", metadata.identity));
    section.push_str(&format!(
        "- **Scanners:** {}\n",
        metadata.scanners.join(", ")
    ));
    section.push_str(&format!(
        "- **Majority vote:** {} of {}\n",
        metadata.vote_threshold,
        metadata.reference_scanners.join(", ")
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &ComparisonReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Scanner Overlap](#scanner-overlap)\n");
    toc.push_str("- [Scanner Accuracy](#scanner-accuracy)\n");
    if !report.differences.is_empty() {
        toc.push_str("- [Differences](#differences)\n");
    }
    if !report.plots.is_empty() {
        toc.push_str("- [Plots](#plots)\n");
    }
    toc.push('\n');

    toc
}

fn generate_summary_section(report: &ComparisonReport) -> String {
    let mut section = String::new();
    let consensus = &report.consensus;

    section.push_str("## Summary\n\n");
    section.push_str("| Artifacts | ✅ Confirmed | ❔ Unconfirmed |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} |\n\n",
        consensus.artifacts, consensus.confirmed, consensus.unconfirmed
    ));

    section.push_str("### Components by Scanner\n\n");
    section.push_str("| | Scanner | Components | Artifacts |\n");
    section.push_str("|:---:|:---|:---:|:---:|\n");
    for scanner in &report.scanners {
        section.push_str(&format!(
            "| {} | {} (`{}`) | {} | {} |\n",
            scanner.letter, scanner.legend, scanner.scanner, scanner.components, scanner.artifacts
        ));
    }
    section.push('\n');

    section
}

fn generate_overlap_section(report: &ComparisonReport) -> String {
    let mut section = String::new();

    section.push_str("## Scanner Overlap\n\n");

    if report.pairs.is_empty() {
        section.push_str("At least two scanners are needed for an overlap table.\n\n");
    } else {
        section.push_str("| Left | Right | Only left | Only right | Both | Jaccard |\n");
        section.push_str("|:---|:---|:---:|:---:|:---:|:---:|\n");
        for pair in &report.pairs {
            let union = pair.only_left + pair.only_right + pair.both;
            let jaccard = if union == 0 {
                None
            } else {
                Some(pair.both as f64 / union as f64)
            };
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                pair.left,
                pair.right,
                pair.only_left,
                pair.only_right,
                pair.both,
                percent(jaccard)
            ));
        }
        section.push('\n');
    }

    if let Some(ref triple) = report.triple {
        section.push_str(&format!(
            "### Three-way overlap: {}\n\n",
            triple.names.join(" / ")
        ));
        section.push_str("| Region | Artifacts |\n");
        section.push_str("|:---|:---:|\n");
        let regions = [
            (true, false, false),
            (false, true, false),
            (true, true, false),
            (false, false, true),
            (true, false, true),
            (false, true, true),
            (true, true, true),
        ];
        for (a, b, c) in regions {
            let bits: String = [a, b, c]
                .iter()
                .map(|&in_set| if in_set { '1' } else { '0' })
                .collect();
            section.push_str(&format!("| `{}` | {} |\n", bits, triple.region(a, b, c)));
        }
        section.push('\n');
    }

    section
}

fn generate_accuracy_section(scanners: &[ScannerSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Scanner Accuracy\n\n");
    section.push_str("Scored against the majority vote of the reference scanners.\n\n");
    section.push_str("| Scanner | TN | FP | FN | TP | Precision | Recall | F1 | Accuracy |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for s in scanners {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            s.scanner,
            s.matrix.tn,
            s.matrix.fp,
            s.matrix.fn_,
            s.matrix.tp,
            percent(s.precision),
            percent(s.recall),
            percent(s.f1),
            percent(s.accuracy)
        ));
    }
    section.push('\n');

    section
}

fn generate_differences_section(differences: &[ScannerDifference]) -> String {
    if differences.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Differences\n\n");

    for diff in differences {
        section.push_str(&format!(
            "### {} but not {} ({})\n\n",
            diff.left, diff.right, diff.total
        ));

        if diff.artifacts.is_empty() {
            section.push_str("None.\n\n");
            continue;
        }

        for artifact in &diff.artifacts {
            section.push_str(&format!("- `{}`\n", artifact));
        }
        if diff.total > diff.artifacts.len() {
            section.push_str(&format!(
                "- *... and {} more*\n",
                diff.total - diff.artifacts.len()
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_plots_section(plots: &[String]) -> String {
    if plots.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Plots\n\n");
    for plot in plots {
        section.push_str(&format!("![{}]({})\n\n", plot, plot));
    }

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by sbomdiff*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ComparisonReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

//! sbomdiff - SBOM comparison across security scanners
//!
//! A CLI tool that pulls the component inventories of several scanners
//! from Dependency-Track or DefectDojo, reconciles them, labels every
//! artifact by majority vote and draws Venn diagrams and confusion
//! matrices.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, missing data, etc.)

mod analysis;
mod cli;
mod clients;
mod config;
mod inventory;
mod models;
mod report;

use analysis::{
    complete_with_missing, difference_between_scanners, filter_by_project_name_version,
    filter_by_project_name_version_and_scanner, filter_rows_with_string_in_column, LabelingRules,
    ScannerSets,
};
use anyhow::{bail, Context, Result};
use cli::{Args, Command, DojoCommand, OutputFormat, ProjectArgs};
use clients::dependency_track::CollectOptions;
use clients::{ClientSettings, DefectDojoClient, DependencyTrackClient};
use config::{Config, CONFIG_FILE_NAME};
use inventory::{assign_keys, IdentityStrategy};
use models::{project_name_version, ComponentRecord, ScannerDataset};
use report::{
    build_report, confusion_matrix_plot, output_folder, similarity_plot, PlotSize, ReportInputs,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const SIMILARITY_PLOT: &str = "similarity.svg";
const CONFUSION_PLOT: &str = "confusion_matrix.svg";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging needed
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = init_logging(&args, &config) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }

    info!("sbomdiff v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(&args, &config).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle `init-config`: generate a default .sbomdiff.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set API endpoints, scanners and the majority vote.");
    Ok(())
}

fn log_level(args: &Args, config: &Config) -> tracing::Level {
    if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    }
}

/// Initialize logging based on verbosity settings.
///
/// With a log file the output goes there without ANSI colors.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = log_level(args, config);

    match config.general.log_file {
        Some(ref log_file) => {
            let file = std::fs::File::create(log_file)
                .with_context(|| format!("Failed to create log file {}", log_file))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}

async fn run(args: &Args, config: &Config) -> Result<()> {
    match &args.command {
        Command::Projects { filter } => handle_projects(config, filter.as_deref()).await,
        Command::Collect { target, output } => {
            let dataset =
                collect_from_dependency_track(args, config, target, config.analysis.identity)
                    .await?;
            save_dataset(config, &dataset, output.as_deref())
        }
        Command::Compare {
            target,
            input,
            format,
            identity,
            scanners,
            no_plots,
        } => {
            let identity = identity.unwrap_or(config.analysis.identity);
            let dataset = obtain_dataset(args, config, target, input.as_deref(), identity).await?;
            let scanners = scanners
                .clone()
                .unwrap_or_else(|| config.scanners.names.clone());
            handle_compare(config, &dataset, scanners, identity, *format, *no_plots)
        }
        Command::Diff {
            target,
            input,
            left,
            right,
            flag,
            label,
            identity,
        } => {
            let identity = identity.unwrap_or(config.analysis.identity);
            let dataset = obtain_dataset(args, config, target, input.as_deref(), identity).await?;
            handle_diff(config, &dataset, left, right, *flag, *label).map(|_| ())
        }
        Command::Search {
            target,
            input,
            column,
            contains,
            scanner,
        } => handle_search(target, input, column, contains, scanner.as_deref()).map(|_| ()),
        Command::Dojo { command } => handle_dojo(config, command).await,
        Command::InitConfig => handle_init_config(),
    }
}

/// List Dependency-Track projects.
async fn handle_projects(config: &Config, filter: Option<&str>) -> Result<()> {
    let client = DependencyTrackClient::new(ClientSettings::from(&config.dependency_track))?;
    let mut projects = client.list_projects().await?;

    if let Some(filter) = filter {
        projects.retain(|p| p.name.contains(filter));
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));

    println!("📦 {} projects\n", projects.len());
    for project in &projects {
        println!(
            "   {}  {}  ({})",
            project.name,
            project.version.as_deref().unwrap_or("-"),
            project.uuid
        );
    }
    Ok(())
}

async fn collect_from_dependency_track(
    args: &Args,
    config: &Config,
    target: &ProjectArgs,
    identity: IdentityStrategy,
) -> Result<ScannerDataset> {
    let client = DependencyTrackClient::new(ClientSettings::from(&config.dependency_track))?;

    println!(
        "📥 Fetching SBOMs for {} from Dependency-Track",
        project_name_version(&target.project, target.project_version.as_deref())
    );

    let options = CollectOptions {
        scanners: config.scanners.names.clone(),
        identity,
        concurrency: config.general.concurrency,
        show_progress: !args.quiet,
    };

    let dataset = client
        .collect_scanner_data(&target.project, target.project_version.as_deref(), &options)
        .await
        .with_context(|| format!("Failed to collect SBOMs for {}", target.project))?;

    print_dataset_summary(&dataset);
    Ok(dataset)
}

fn print_dataset_summary(dataset: &ScannerDataset) {
    println!("\n📊 Collected from {}:", dataset.source);
    for (scanner, count) in dataset.component_counts() {
        println!("   {}: {} components", scanner, count);
    }
    println!("   Total: {} records", dataset.records.len());
}

/// Write a dataset as JSON, by default to `<output.dir>/<pnv>/dataset.json`.
fn save_dataset(config: &Config, dataset: &ScannerDataset, output: Option<&Path>) -> Result<()> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => output_folder(Path::new(&config.output.dir), &dataset.project_name_version())?
            .join("dataset.json"),
    };

    let content =
        serde_json::to_string_pretty(dataset).context("Failed to serialize the dataset")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write dataset to {}", path.display()))?;

    println!("\n✅ Dataset saved to: {}", path.display());
    Ok(())
}

fn load_dataset(path: &Path) -> Result<ScannerDataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))
}

/// Records of `target` only.
fn select_target(records: &mut Vec<ComponentRecord>, target: &ProjectArgs) {
    records.retain(|r| {
        r.project_name == target.project
            && target
                .project_version
                .as_ref()
                .map_or(true, |v| r.project_version.as_ref() == Some(v))
    });
}

/// Load the dataset from `input` or fetch it from Dependency-Track.
async fn obtain_dataset(
    args: &Args,
    config: &Config,
    target: &ProjectArgs,
    input: Option<&Path>,
    identity: IdentityStrategy,
) -> Result<ScannerDataset> {
    let mut dataset = match input {
        Some(path) => {
            println!("📂 Loading dataset: {}", path.display());
            let mut dataset = load_dataset(path)?;
            assign_keys(&mut dataset.records, identity);
            dataset
        }
        None => collect_from_dependency_track(args, config, target, identity).await?,
    };

    select_target(&mut dataset.records, target);
    if dataset.records.is_empty() {
        bail!(
            "No component records for project {}",
            project_name_version(&target.project, target.project_version.as_deref())
        );
    }

    Ok(dataset)
}

/// Group records by project and version.
fn group_by_project_version(
    records: &[ComponentRecord],
) -> BTreeMap<(String, Option<String>), Vec<ComponentRecord>> {
    let mut groups: BTreeMap<(String, Option<String>), Vec<ComponentRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.project_name.clone(), record.project_version.clone()))
            .or_default()
            .push(record.clone());
    }
    groups
}

fn handle_compare(
    config: &Config,
    dataset: &ScannerDataset,
    mut scanners: Vec<String>,
    identity: IdentityStrategy,
    format: OutputFormat,
    no_plots: bool,
) -> Result<()> {
    let present = dataset.scanner_names();
    scanners.retain(|s| {
        let found = present.contains(s);
        if !found {
            warn!("Scanner {} has no records and is left out", s);
        }
        found
    });
    if scanners.is_empty() {
        bail!("None of the selected scanners has component records");
    }

    let legends: Vec<String> = scanners.iter().map(|s| config.scanners.legend(s)).collect();
    let rules = LabelingRules::from(&config.analysis);
    for weakness in rules.weaknesses(&scanners) {
        warn!("Majority vote: {}", weakness);
    }
    let size = PlotSize::from(&config.output);

    println!("\n🔬 Comparing {} scanners ({} identity)", scanners.len(), identity);

    for ((project_name, project_version), records) in group_by_project_version(&dataset.records) {
        let pnv = project_name_version(&project_name, project_version.as_deref());
        let folder = output_folder(Path::new(&config.output.dir), &pnv)?;
        info!("Writing results for {} to {}", pnv, folder.display());

        let mut comparison = build_report(&ReportInputs {
            project_name: &project_name,
            project_version: project_version.as_deref(),
            source: dataset.source,
            collected_at: dataset.collected_at,
            records: &records,
            scanners: &scanners,
            legends: &legends,
            identity,
            rules: &rules,
            max_listed: config.report.max_listed_artifacts,
            include_differences: config.report.include_differences,
        });

        if !no_plots {
            let title = match project_version {
                Some(ref version) => format!(
                    "SBOM similarity plot for project {} version {}",
                    project_name, version
                ),
                None => format!("SBOM similarity plot for project {}", project_name),
            };
            let sets = ScannerSets::from_records(&records, &scanners);
            similarity_plot(
                &folder.join(SIMILARITY_PLOT),
                &title,
                &sets,
                comparison.triple.as_ref(),
                &legends,
                size,
            )?;

            let matrices: Vec<_> = comparison
                .scanners
                .iter()
                .map(|s| (s.scanner.clone(), s.matrix))
                .collect();
            confusion_matrix_plot(
                &folder.join(CONFUSION_PLOT),
                &format!("Confusion matrix for project {}", pnv),
                &matrices,
                size,
            )?;

            comparison.plots = vec![SIMILARITY_PLOT.to_string(), CONFUSION_PLOT.to_string()];
        }

        let content = match format {
            OutputFormat::Json => report::generate_json_report(&comparison)?,
            OutputFormat::Markdown => report::generate_markdown_report(&comparison),
        };
        let report_path: PathBuf = folder.join(format!("report.{}", format.extension()));
        std::fs::write(&report_path, &content)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

        println!("\n📊 {}:", pnv);
        println!(
            "   Artifacts: {} | ✅ Confirmed: {} | ❔ Unconfirmed: {}",
            comparison.consensus.artifacts,
            comparison.consensus.confirmed,
            comparison.consensus.unconfirmed
        );
        for s in &comparison.scanners {
            println!(
                "   {} {}: TP {} | FP {} | FN {} | TN {}",
                s.letter, s.legend, s.matrix.tp, s.matrix.fp, s.matrix.fn_, s.matrix.tn
            );
        }
        println!("   Report saved to: {}", report_path.display());
    }

    println!("\n✅ Comparison complete!");
    Ok(())
}

fn handle_diff(
    config: &Config,
    dataset: &ScannerDataset,
    left: &str,
    right: &str,
    flag: u8,
    label: u8,
) -> Result<BTreeMap<String, Vec<String>>> {
    let present = dataset.scanner_names();
    for scanner in [left, right] {
        if !present.iter().any(|s| s == scanner) {
            warn!("Scanner {} has no records in this dataset", scanner);
        }
    }

    let rules = LabelingRules::from(&config.analysis);
    let completed = complete_with_missing(&dataset.records, &rules);
    let mut differences = BTreeMap::new();

    for (project_name, project_version) in group_by_project_version(&completed).into_keys() {
        let pnv = project_name_version(&project_name, project_version.as_deref());
        let artifacts = difference_between_scanners(&completed, &pnv, left, right, flag, label);

        println!(
            "\n🔍 {}: {} artifacts in {} (flag {}, label {}) missing from {}",
            pnv,
            artifacts.len(),
            left,
            flag,
            label,
            right
        );
        for artifact in &artifacts {
            println!("   {}", artifact);
        }
        differences.insert(pnv, artifacts);
    }

    Ok(differences)
}

fn handle_search(
    target: &ProjectArgs,
    input: &Path,
    column: &str,
    contains: &str,
    scanner: Option<&str>,
) -> Result<Vec<ComponentRecord>> {
    let dataset = load_dataset(input)?;
    let pnv = project_name_version(&target.project, target.project_version.as_deref());

    let scoped = match (target.project_version.is_some(), scanner) {
        (true, Some(scanner)) => {
            filter_by_project_name_version_and_scanner(&dataset.records, &pnv, scanner)
        }
        (true, None) => filter_by_project_name_version(&dataset.records, &pnv),
        (false, _) => {
            let mut records = dataset.records.clone();
            select_target(&mut records, target);
            if let Some(scanner) = scanner {
                records.retain(|r| r.scanner_name == scanner);
            }
            records
        }
    };

    let matches = filter_rows_with_string_in_column(&scoped, column, contains)?;

    println!(
        "🔍 {} of {} records where {} contains '{}'\n",
        matches.len(),
        scoped.len(),
        column,
        contains
    );
    for record in &matches {
        println!(
            "   [{}] {} {}  {}",
            record.scanner_name,
            record.name,
            record.version.as_deref().unwrap_or("-"),
            record.purl.as_deref().unwrap_or("")
        );
    }
    Ok(matches)
}

async fn handle_dojo(config: &Config, command: &DojoCommand) -> Result<()> {
    let client = DefectDojoClient::new(ClientSettings::from(&config.defectdojo))?;

    match command {
        DojoCommand::Products => {
            let products = client.list_products().await?;
            println!("📦 {} products\n", products.len());
            for product in &products {
                println!("   {:>6}  {}", product.id, product.name);
            }
        }
        DojoCommand::Product { id } => {
            let product = client.get_product(*id).await?;
            println!("📦 {}  {}", product.id, product.name);
        }
        DojoCommand::Engagements { product } => {
            let engagements = client.engagements_for_product(*product).await?;
            println!("📋 {} engagements\n", engagements.len());
            for engagement in &engagements {
                println!(
                    "   {:>6}  {}  {}",
                    engagement.id,
                    engagement.name,
                    engagement.version.as_deref().unwrap_or("-")
                );
            }
        }
        DojoCommand::Tests { engagement } => {
            let tests = client.tests_for_engagement(*engagement).await?;
            println!("🧪 {} tests\n", tests.len());
            for test in &tests {
                println!("   {:>6}  {}", test.id, test.scanner_name());
            }
        }
        DojoCommand::Findings { test } => {
            let findings = client.findings_for_test(*test).await?;
            println!("🔎 {} findings\n", findings.len());
            for finding in &findings {
                println!(
                    "   {:>6}  [{}] {}  {} {}  {}",
                    finding.id,
                    finding.severity.as_deref().unwrap_or("-"),
                    finding.title,
                    finding.component_name.as_deref().unwrap_or("-"),
                    finding.component_version.as_deref().unwrap_or(""),
                    finding.cve.as_deref().unwrap_or("")
                );
            }
        }
        DojoCommand::Collect {
            engagement,
            target,
            output,
        } => {
            println!("📥 Collecting findings of engagement {}", engagement);
            let dataset = client
                .collect_findings_inventory(
                    *engagement,
                    &target.project,
                    target.project_version.as_deref(),
                    config.analysis.identity,
                )
                .await
                .with_context(|| format!("Failed to collect engagement {}", engagement))?;
            print_dataset_summary(&dataset);
            save_dataset(config, &dataset, output.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::DataSource;
    use tempfile::TempDir;

    fn record(version: Option<&str>, scanner: &str, name: &str) -> ComponentRecord {
        ComponentRecord {
            project_name: "shop".to_string(),
            project_version: version.map(String::from),
            scanner_name: scanner.to_string(),
            name: name.to_string(),
            version: Some("1".to_string()),
            name_version: Some(format!("{}@1", name)),
            ..Default::default()
        }
    }

    fn target(version: Option<&str>) -> ProjectArgs {
        ProjectArgs {
            project: "shop".to_string(),
            project_version: version.map(String::from),
        }
    }

    fn dataset(records: Vec<ComponentRecord>) -> ScannerDataset {
        ScannerDataset {
            project_name: "shop".to_string(),
            project_version: None,
            source: DataSource::DependencyTrack,
            collected_at: Utc::now(),
            records,
        }
    }

    #[test]
    fn test_select_target() {
        let mut records = vec![
            record(Some("1.0"), "syft_cont", "a"),
            record(Some("2.0"), "syft_cont", "b"),
        ];
        records.push(ComponentRecord {
            project_name: "other".to_string(),
            ..record(Some("1.0"), "syft_cont", "c")
        });

        let mut all = records.clone();
        select_target(&mut all, &target(None));
        assert_eq!(all.len(), 2);

        select_target(&mut records, &target(Some("2.0")));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "b");
    }

    #[test]
    fn test_group_by_project_version() {
        let records = vec![
            record(Some("1.0"), "syft_cont", "a"),
            record(Some("2.0"), "syft_cont", "b"),
            record(Some("1.0"), "trivy_cont", "a"),
        ];
        let groups = group_by_project_version(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&("shop".to_string(), Some("1.0".to_string()))].len(), 2);
    }

    #[test]
    fn test_dataset_file_roundtrip_reassigns_identity() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().display().to_string();

        let mut data = dataset(vec![record(Some("1.0"), "syft_cont", "My_Lib")]);
        data.project_version = Some("1.0".to_string());
        save_dataset(&config, &data, None).unwrap();

        let path = dir.path().join("shop_1.0").join("dataset.json");
        let mut loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.records.len(), 1);

        assign_keys(&mut loaded.records, IdentityStrategy::Normalized);
        assert_eq!(loaded.records[0].name_version.as_deref(), Some("my-lib@1"));
    }

    #[test]
    fn test_handle_compare_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().display().to_string();

        let records = vec![
            record(Some("2.0"), "gitlab_cont", "a"),
            record(Some("2.0"), "jfrog_advanced_security_cont", "a"),
            record(Some("2.0"), "syft_cont", "a"),
            record(Some("2.0"), "syft_cont", "b"),
            record(Some("2.0"), "trivy_cont", "b"),
        ];

        handle_compare(
            &config,
            &dataset(records),
            config.scanners.names.clone(),
            IdentityStrategy::NameVersion,
            OutputFormat::Markdown,
            false,
        )
        .unwrap();

        let folder = dir.path().join("shop_2.0");
        assert!(folder.join(SIMILARITY_PLOT).is_file());
        assert!(folder.join(CONFUSION_PLOT).is_file());

        let report = std::fs::read_to_string(folder.join("report.md")).unwrap();
        assert!(report.contains("# SBOM Comparison Report"));
        // jfrog_cont has no records and is left out
        assert!(!report.contains("jfrog_cont`"));
    }

    #[test]
    fn test_handle_compare_without_known_scanners() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().display().to_string();

        let result = handle_compare(
            &config,
            &dataset(vec![record(Some("2.0"), "unknown", "a")]),
            config.scanners.names.clone(),
            IdentityStrategy::NameVersion,
            OutputFormat::Json,
            true,
        );
        assert!(result.is_err());
    }

    fn write_dataset(dir: &TempDir, records: Vec<ComponentRecord>) -> PathBuf {
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, serde_json::to_string(&dataset(records)).unwrap()).unwrap();
        path
    }

    fn search_records() -> Vec<ComponentRecord> {
        vec![
            record(Some("1.0"), "syft_cont", "django"),
            record(Some("1.0"), "trivy_cont", "django"),
            record(Some("2.0"), "syft_cont", "django-rest"),
            record(Some("2.0"), "trivy_cont", "flask"),
            ComponentRecord {
                project_name: "other".to_string(),
                ..record(Some("1.0"), "syft_cont", "django")
            },
        ]
    }

    #[test]
    fn test_handle_search_scopes_by_version_and_scanner() {
        let dir = TempDir::new().unwrap();
        let input = write_dataset(&dir, search_records());

        let found = handle_search(&target(Some("1.0")), &input, "name", "django", None).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.project_version.as_deref() == Some("1.0")));
        assert!(found.iter().all(|r| r.project_name == "shop"));

        let found = handle_search(
            &target(Some("1.0")),
            &input,
            "name",
            "django",
            Some("trivy_cont"),
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].scanner_name, "trivy_cont");
    }

    #[test]
    fn test_handle_search_without_version_covers_all_versions() {
        let dir = TempDir::new().unwrap();
        let input = write_dataset(&dir, search_records());

        let found = handle_search(&target(None), &input, "name", "django", None).unwrap();
        assert_eq!(found.len(), 3);

        let found =
            handle_search(&target(None), &input, "name", "django", Some("syft_cont")).unwrap();
        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["django", "django-rest"]);

        let found =
            handle_search(&target(None), &input, "scanner_name", "trivy", None).unwrap();
        assert_eq!(found.len(), 2);

        assert!(handle_search(&target(None), &input, "colour", "red", None).is_err());
    }

    #[test]
    fn test_handle_diff_per_project_version() {
        let config = Config::default();
        let records = vec![
            // 1.0: every scanner agrees on a
            record(Some("1.0"), "gitlab_cont", "a"),
            record(Some("1.0"), "jfrog_advanced_security_cont", "a"),
            record(Some("1.0"), "syft_cont", "a"),
            record(Some("1.0"), "trivy_cont", "a"),
            // 2.0: a and b confirmed, c unconfirmed; trivy misses b
            record(Some("2.0"), "gitlab_cont", "a"),
            record(Some("2.0"), "gitlab_cont", "b"),
            record(Some("2.0"), "jfrog_advanced_security_cont", "a"),
            record(Some("2.0"), "syft_cont", "a"),
            record(Some("2.0"), "syft_cont", "b"),
            record(Some("2.0"), "syft_cont", "c"),
            record(Some("2.0"), "trivy_cont", "a"),
            record(Some("2.0"), "trivy_cont", "d"),
        ];
        let data = dataset(records);

        let reported =
            handle_diff(&config, &data, "syft_cont", "trivy_cont", 1, 1).unwrap();
        assert_eq!(reported.len(), 2);
        assert!(reported["shop_1.0"].is_empty());
        assert_eq!(reported["shop_2.0"], vec!["b@1".to_string()]);

        // Artifacts trivy missed that the vote confirmed.
        let missed = handle_diff(&config, &data, "trivy_cont", "syft_cont", 0, 1).unwrap();
        assert_eq!(missed["shop_2.0"], vec!["b@1".to_string()]);

        let unconfirmed =
            handle_diff(&config, &data, "syft_cont", "gitlab_cont", 1, 0).unwrap();
        assert_eq!(unconfirmed["shop_2.0"], vec!["c@1".to_string()]);
    }
}

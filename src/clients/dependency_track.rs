//! Dependency-Track API client.
//!
//! Every scanner uploads its SBOM into its own Dependency-Track project named
//! `<project>_<scanner>`. This client finds those projects and downloads their
//! CycloneDX components.

use super::{build_http_client, decode, send, ApiError, ClientSettings};
use crate::inventory::{flatten_components, IdentityStrategy, RecordContext};
use crate::models::{CycloneDxBom, CycloneDxComponent, DataSource, ProjectRef, ScannerDataset};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

/// A scanner project matched to the scanner that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerProject {
    pub scanner_name: String,
    pub project: ProjectRef,
}

/// Options for collecting a project's scanner data.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub scanners: Vec<String>,
    pub identity: IdentityStrategy,
    pub concurrency: usize,
    pub show_progress: bool,
}

/// Client for the Dependency-Track REST API.
pub struct DependencyTrackClient {
    settings: ClientSettings,
    api_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl DependencyTrackClient {
    /// Create a client. Fails if no API key is configured.
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingApiKey("Dependency-Track"))?;

        let http_client = build_http_client(&settings)?;
        let api_url = settings.api_url();

        info!("Dependency-Track API at {}", api_url);
        if !settings.verify_tls {
            warn!("TLS certificate verification is disabled for Dependency-Track");
        }

        Ok(Self {
            settings,
            api_url,
            api_key,
            http_client,
        })
    }

    /// Retrieve all projects with their versions and UUIDs.
    pub async fn list_projects(&self) -> Result<Vec<ProjectRef>, ApiError> {
        let url = format!("{}/project", self.api_url);
        let page_size = self.settings.page_size.max(1);
        let mut projects = Vec::new();
        let mut page = 1usize;

        loop {
            let request = self
                .http_client
                .get(&url)
                .header("accept", "application/json")
                .header("X-Api-Key", &self.api_key)
                .query(&[
                    ("pageNumber", page.to_string()),
                    ("pageSize", page_size.to_string()),
                ]);

            let response = send(request, &url, self.settings.timeout_seconds).await?;
            let batch: Vec<ProjectRef> = decode(response, &url).await?;
            let received = batch.len();
            debug!("Project page {} returned {} entries", page, received);

            projects.extend(batch);
            if received < page_size {
                break;
            }
            page += 1;
        }

        info!("Retrieved {} projects", projects.len());
        Ok(projects)
    }

    /// Download the CycloneDX components of one project.
    ///
    /// Returns `Ok(None)` when the BOM carries no component list.
    pub async fn fetch_components(
        &self,
        project_uuid: &str,
    ) -> Result<Option<Vec<CycloneDxComponent>>, ApiError> {
        let url = format!("{}/bom/cyclonedx/project/{}", self.api_url, project_uuid);

        let request = self
            .http_client
            .get(&url)
            .header("accept", "application/vnd.cyclonedx+json")
            .header("X-Api-Key", &self.api_key)
            .query(&[("format", "json")]);

        let response = send(request, &url, self.settings.timeout_seconds).await?;
        let bom: CycloneDxBom = decode(response, &url).await?;

        Ok(bom.components)
    }

    /// Fetch and flatten the SBOMs of every scanner project of `project_name`.
    pub async fn collect_scanner_data(
        &self,
        project_name: &str,
        project_version: Option<&str>,
        options: &CollectOptions,
    ) -> Result<ScannerDataset, ApiError> {
        let projects = self.list_projects().await?;
        let matches =
            match_scanner_projects(&projects, project_name, project_version, &options.scanners);

        if matches.is_empty() {
            return Err(ApiError::NoMatchingProjects {
                project: project_name.to_string(),
                version: project_version.unwrap_or("any").to_string(),
            });
        }

        info!(
            "Found {} scanner projects for {}",
            matches.len(),
            project_name
        );

        let progress = if options.show_progress {
            let pb = ProgressBar::new(matches.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };
        let pb = &progress;

        let fetched: Vec<Result<(ScannerProject, Option<Vec<CycloneDxComponent>>), ApiError>> =
            stream::iter(matches)
                .map(|matched| async move {
                    if let Some(pb) = pb {
                        pb.set_message(matched.scanner_name.clone());
                    }
                    let components = self.fetch_components(&matched.project.uuid).await;
                    if let Some(pb) = pb {
                        pb.inc(1);
                    }
                    Ok::<_, ApiError>((matched, components?))
                })
                .buffered(options.concurrency.max(1))
                .collect()
                .await;

        if let Some(pb) = progress.as_ref() {
            pb.finish_and_clear();
        }

        let mut records = Vec::new();
        for result in fetched {
            let (matched, components) = result?;
            let Some(components) = components else {
                warn!(
                    "No component information available for project {} with project uuid {}",
                    project_name, matched.project.uuid
                );
                continue;
            };

            let ctx = RecordContext {
                project_name,
                project_version: matched.project.version.as_deref(),
                scanner_name: &matched.scanner_name,
                project_uuid: Some(&matched.project.uuid),
            };
            let flattened = flatten_components(&ctx, &components, options.identity);
            debug!(
                "{}: {} components",
                matched.scanner_name,
                flattened.len()
            );
            records.extend(flattened);
        }

        Ok(ScannerDataset {
            project_name: project_name.to_string(),
            project_version: project_version.map(String::from),
            source: DataSource::DependencyTrack,
            collected_at: Utc::now(),
            records,
        })
    }
}

/// Select the scanner projects of `project_name`, in scanner order.
///
/// A project belongs to scanner `s` when its name is `<project_name>_<s>`.
/// When `version` is given the project version must match it.
pub fn match_scanner_projects(
    projects: &[ProjectRef],
    project_name: &str,
    version: Option<&str>,
    scanners: &[String],
) -> Vec<ScannerProject> {
    let mut matches = Vec::new();

    for scanner in scanners {
        let expected = format!("{}_{}", project_name, scanner);
        for project in projects.iter().filter(|p| p.name == expected) {
            if let Some(v) = version {
                if project.version.as_deref() != Some(v) {
                    continue;
                }
            }
            matches.push(ScannerProject {
                scanner_name: scanner.clone(),
                project: project.clone(),
            });
        }
    }

    matches
}

//! DefectDojo API client.

use super::{build_http_client, decode, send, ApiError, ClientSettings};
use crate::inventory::{flatten_findings, IdentityStrategy, RecordContext};
use crate::models::{DataSource, DojoTest, Engagement, Finding, Product, ScannerDataset};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One page of a DefectDojo list endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

/// Client for the DefectDojo REST API.
pub struct DefectDojoClient {
    settings: ClientSettings,
    api_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl DefectDojoClient {
    /// Create a client. Fails if no API token is configured.
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingApiKey("DefectDojo"))?;
        let token = format!("Token {}", api_key);

        let http_client = build_http_client(&settings)?;
        let api_url = settings.api_url();

        info!("DefectDojo API at {}", api_url);
        if !settings.verify_tls {
            warn!("TLS certificate verification is disabled for DefectDojo");
        }

        Ok(Self {
            settings,
            api_url,
            token,
            http_client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self
            .http_client
            .get(url)
            .header("accept", "application/json")
            .header("Authorization", &self.token)
            .query(params);

        let response = send(request, url, self.settings.timeout_seconds).await?;
        decode(response, url).await
    }

    /// Fetch every page of a list endpoint by following `next` links.
    async fn get_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        filter: Option<(&str, u64)>,
    ) -> Result<Vec<T>, ApiError> {
        let url = format!("{}/{}/", self.api_url, endpoint);

        let mut params = vec![("limit", self.settings.page_size.max(1).to_string())];
        if let Some((key, value)) = filter {
            params.push((key, value.to_string()));
        }

        let mut page: Page<T> = self.get_json(&url, &params).await?;
        let mut items = Vec::new();

        loop {
            items.extend(page.results);
            match page.next {
                Some(next) => {
                    debug!("Following next page: {}", next);
                    page = self.get_json(&next, &[]).await?;
                }
                None => break,
            }
        }

        debug!("{}: {} entries", endpoint, items.len());
        Ok(items)
    }

    /// List all products.
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_all("products", None).await
    }

    /// Get a product by its id.
    pub async fn get_product(&self, product_id: u64) -> Result<Product, ApiError> {
        let url = format!("{}/products/{}/", self.api_url, product_id);
        self.get_json(&url, &[]).await
    }

    /// List the engagements of a product.
    pub async fn engagements_for_product(
        &self,
        product_id: u64,
    ) -> Result<Vec<Engagement>, ApiError> {
        self.get_all("engagements", Some(("product", product_id)))
            .await
    }

    /// List the tests (scan imports) of an engagement.
    pub async fn tests_for_engagement(&self, engagement_id: u64) -> Result<Vec<DojoTest>, ApiError> {
        self.get_all("tests", Some(("engagement", engagement_id)))
            .await
    }

    /// List the findings of a test.
    pub async fn findings_for_test(&self, test_id: u64) -> Result<Vec<Finding>, ApiError> {
        self.get_all("findings", Some(("test", test_id))).await
    }

    /// Build a scanner dataset from the findings of an engagement.
    ///
    /// Each test's scan type is treated as a scanner; tests of the same type
    /// are merged.
    pub async fn collect_findings_inventory(
        &self,
        engagement_id: u64,
        project_name: &str,
        project_version: Option<&str>,
        identity: IdentityStrategy,
    ) -> Result<ScannerDataset, ApiError> {
        let tests = self.tests_for_engagement(engagement_id).await?;
        info!(
            "Engagement {} has {} tests",
            engagement_id,
            tests.len()
        );

        let mut by_scanner: Vec<(String, Vec<Finding>)> = Vec::new();
        for test in &tests {
            let findings = self.findings_for_test(test.id).await?;
            let scanner = test.scanner_name();
            debug!("Test {} ({}): {} findings", test.id, scanner, findings.len());

            match by_scanner.iter_mut().find(|(name, _)| *name == scanner) {
                Some((_, existing)) => existing.extend(findings),
                None => by_scanner.push((scanner, findings)),
            }
        }

        let mut records = Vec::new();
        for (scanner, findings) in &by_scanner {
            let ctx = RecordContext {
                project_name,
                project_version,
                scanner_name: scanner,
                project_uuid: None,
            };
            records.extend(flatten_findings(&ctx, findings, identity));
        }

        Ok(ScannerDataset {
            project_name: project_name.to_string(),
            project_version: project_version.map(String::from),
            source: DataSource::DefectDojo,
            collected_at: Utc::now(),
            records,
        })
    }
}

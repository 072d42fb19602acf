//! Sources for the resource group export document.

use crate::azure::template::ArmTemplate;
use crate::shared::logging;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POLLS: u32 = 120;

#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn export(&self, resource_group: &str) -> anyhow::Result<ArmTemplate>;
}

/// Accepts either a bare template or the export response that wraps it in
/// a `template` field.
pub fn parse_export_document(raw: &str) -> anyhow::Result<ArmTemplate> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("parsing the export document as JSON")?;
    let template = match value.get("template") {
        Some(inner) => inner.clone(),
        None => value,
    };
    serde_json::from_value(template).context("unmarshalling the template")
}

/// Reads a previously exported document from disk.
pub struct FileTemplateSource {
    path: PathBuf,
}

impl FileTemplateSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    async fn export(&self, resource_group: &str) -> anyhow::Result<ArmTemplate> {
        logging::info(&format!(
            "Reading export of resource group {} from {}",
            resource_group,
            self.path.display()
        ));
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading template file {}", self.path.display()))?;
        parse_export_document(&raw)
    }
}

/// Asks the management API to export the resource group.
pub struct ArmExportClient {
    client: reqwest::Client,
    endpoint: String,
    api_version: String,
    subscription_id: String,
    access_token: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl ArmExportClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        subscription_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_version: api_version.into(),
            subscription_id: subscription_id.into(),
            access_token: access_token.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    pub fn export_url(&self, resource_group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{}/exportTemplate?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.subscription_id,
            resource_group,
            self.api_version
        )
    }

    fn retry_after(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.poll_interval)
    }

    async fn poll(
        &self,
        resource_group: &str,
        location: String,
        mut wait: Duration,
    ) -> anyhow::Result<String> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(wait).await;
            logging::debug(&format!(
                "Polling export of resource group {} (attempt {})",
                resource_group, attempt
            ));
            let resp = self
                .client
                .get(&location)
                .bearer_auth(&self.access_token)
                .send()
                .await
                .with_context(|| {
                    format!(
                        "waiting for exporting the template of resource group {}",
                        resource_group
                    )
                })?;

            match resp.status() {
                StatusCode::OK => return Ok(resp.text().await?),
                StatusCode::ACCEPTED => wait = self.retry_after(resp.headers()),
                status => {
                    let body = resp.text().await.unwrap_or_default();
                    anyhow::bail!(
                        "exporting the template of resource group {} failed with {}: {}",
                        resource_group,
                        status,
                        body
                    );
                }
            }
        }
        anyhow::bail!(
            "exporting the template of resource group {} did not finish after {} polls",
            resource_group,
            self.max_polls
        )
    }
}

#[async_trait]
impl TemplateSource for ArmExportClient {
    async fn export(&self, resource_group: &str) -> anyhow::Result<ArmTemplate> {
        logging::info(&format!("Exporting resource group {}", resource_group));
        let body = serde_json::json!({
            "resources": ["*"],
            "options": "SkipAllParameterization",
        });
        let resp = self
            .client
            .post(self.export_url(resource_group))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .with_context(|| {
                format!("exporting the template of resource group {}", resource_group)
            })?;

        let raw = match resp.status() {
            StatusCode::OK => resp.text().await?,
            StatusCode::ACCEPTED => {
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .context("export accepted without a Location header to poll")?;
                let wait = self.retry_after(resp.headers());
                self.poll(resource_group, location, wait).await?
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!(
                    "exporting the template of resource group {} failed with {}: {}",
                    resource_group,
                    status,
                    body
                );
            }
        };
        parse_export_document(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_and_bare_documents() {
        let bare = r#"{"resources": [{"type": "Microsoft.Test/as", "name": "a"}]}"#;
        let wrapped = format!(r#"{{"template": {}, "error": null}}"#, bare);
        assert_eq!(parse_export_document(bare).unwrap().resources.len(), 1);
        assert_eq!(parse_export_document(&wrapped).unwrap().resources.len(), 1);
        assert!(parse_export_document("not json").is_err());
    }

    #[test]
    fn test_export_url() {
        let client =
            ArmExportClient::new("https://management.azure.com/", "2021-04-01", "sub", "token");
        assert_eq!(
            client.export_url("rg"),
            "https://management.azure.com/subscriptions/sub/resourcegroups/rg/exportTemplate?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_retry_after_falls_back_to_interval() {
        let client = ArmExportClient::new("https://x", "v", "s", "t")
            .with_polling(Duration::from_millis(10), 3);
        let mut headers = HeaderMap::new();
        assert_eq!(client.retry_after(&headers), Duration::from_millis(10));
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(client.retry_after(&headers), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{"template": {"resources": []}}"#).unwrap();
        let tpl = FileTemplateSource::new(path).export("rg").await.unwrap();
        assert!(tpl.resources.is_empty());

        let missing = FileTemplateSource::new(dir.path().join("missing.json"));
        assert!(missing.export("rg").await.is_err());
    }
}

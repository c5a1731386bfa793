//! Best-effort discovery of the GCP billing account and billing-export dataset.
//!
//! Each lookup stands alone: a failed billing call leaves the dataset lookup
//! untouched and vice versa. Failures only ever turn into absent fields.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::BimoResult;
use crate::http_client::build_http_client;

/// Values discovered for a project; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoDetectionResult {
    pub billing_account_id: Option<String>,
    pub bigquery_dataset_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BillingInfo {
    #[serde(rename = "billingAccountName", default)]
    billing_account_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetListItem>,
}

#[derive(Debug, Deserialize)]
struct DatasetListItem {
    #[serde(rename = "datasetReference", default)]
    dataset_reference: Option<DatasetReference>,
}

#[derive(Debug, Deserialize)]
struct DatasetReference {
    #[serde(rename = "datasetId", default)]
    dataset_id: Option<String>,
}

#[derive(Debug, Error)]
enum LookupError {
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(reqwest::StatusCode),
}

/// Queries Cloud Billing and BigQuery with a service-account access token.
pub struct AutoDetector {
    http_client: Client,
    billing_base: String,
    bigquery_base: String,
}

impl AutoDetector {
    pub fn new(config: &AppConfig) -> BimoResult<Self> {
        Ok(Self::with_client(
            build_http_client(config.http_timeout())?,
            config.cloud_billing_base.clone(),
            config.bigquery_base.clone(),
        ))
    }

    pub fn with_client(http_client: Client, billing_base: String, bigquery_base: String) -> Self {
        Self {
            http_client,
            billing_base,
            bigquery_base,
        }
    }

    /// Runs the requested lookups sequentially; never fails.
    #[instrument(skip(self, access_token))]
    pub async fn detect(
        &self,
        project_id: &str,
        access_token: &str,
        need_billing: bool,
        need_dataset: bool,
    ) -> AutoDetectionResult {
        let mut result = AutoDetectionResult::default();

        if need_billing {
            match self.billing_account(project_id, access_token).await {
                Ok(Some(id)) => {
                    info!(billing_account_id = %id, "Detected billing account");
                    result.billing_account_id = Some(id);
                }
                Ok(None) => debug!("Project has no linked billing account"),
                Err(err) => warn!(error = %err, "Cloud Billing lookup failed"),
            }
        }

        if need_dataset {
            match self.billing_dataset(project_id, access_token).await {
                Ok(Some(id)) => {
                    info!(dataset_id = %id, "Detected billing export dataset");
                    result.bigquery_dataset_id = Some(id);
                }
                Ok(None) => debug!("No dataset name contains 'billing'"),
                Err(err) => warn!(error = %err, "BigQuery dataset lookup failed"),
            }
        }

        result
    }

    async fn billing_account(
        &self,
        project_id: &str,
        access_token: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = project_url(&self.billing_base, &["v1", "projects"], project_id, &["billingInfo"])?;
        let info: BillingInfo = self.get_json(url, access_token).await?;
        Ok(info
            .billing_account_name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }

    async fn billing_dataset(
        &self,
        project_id: &str,
        access_token: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = project_url(
            &self.bigquery_base,
            &["bigquery", "v2", "projects"],
            project_id,
            &["datasets"],
        )?;
        let list: DatasetList = self.get_json(url, access_token).await?;
        Ok(list
            .datasets
            .into_iter()
            .filter_map(|item| item.dataset_reference?.dataset_id)
            .find(|id| id.to_lowercase().contains("billing")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
    ) -> Result<T, LookupError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        Ok(response.json().await?)
    }
}

/// `{base}/{prefix..}/{project}/{suffix..}` with the project percent-encoded.
fn project_url(
    base: &str,
    prefix: &[&str],
    project_id: &str,
    suffix: &[&str],
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(prefix)
        .push(project_id)
        .extend(suffix);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_url_encodes_project_segment() {
        let url = project_url(
            "https://cloudbilling.googleapis.com",
            &["v1", "projects"],
            "my project/1",
            &["billingInfo"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cloudbilling.googleapis.com/v1/projects/my%20project%2F1/billingInfo"
        );
    }

    #[test]
    fn project_url_keeps_base_path() {
        let url = project_url(
            "http://127.0.0.1:9000/mock/",
            &["bigquery", "v2", "projects"],
            "p",
            &["datasets"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/mock/bigquery/v2/projects/p/datasets"
        );
    }
}

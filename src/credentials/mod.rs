//! Credential shapes and their collection.
//!
//! Exactly one [`Credentials`] shape travels per request. Unused fields are
//! omitted on the wire rather than sent as null.

pub mod prompter;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BimoError, BimoResult};
use crate::providers::{ConnectionMethod, ProviderId};

pub use prompter::{CannedPrompter, CredentialPrompter, PromptField, TerminalPrompter};

/// Dataset used when the user leaves the BigQuery dataset prompt blank.
pub const DEFAULT_BIGQUERY_DATASET: &str = "billing_export";

/// Provider-specific credential payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    ServiceAccount(ServiceAccountCredentials),
    AzureAd {
        #[serde(rename = "azureAd")]
        azure_ad: AzureAdCredentials,
    },
    ApiKey {
        api_key: String,
    },
    /// Passthrough provider whose optional key was left blank.
    Empty {},
}

/// Google service-account connection material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountCredentials {
    pub service_account_json: String,
    pub project_id: String,
    pub billing_account_id: String,
    pub bigquery_dataset_id: String,
}

/// Azure AD application credentials; every field may be blank.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureAdCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey {
            api_key: key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ServiceAccount(sa) => f
                .debug_struct("ServiceAccount")
                .field("project_id", &sa.project_id)
                .field("billing_account_id", &sa.billing_account_id)
                .field("bigquery_dataset_id", &sa.bigquery_dataset_id)
                .finish_non_exhaustive(),
            Credentials::AzureAd { azure_ad } => f
                .debug_struct("AzureAd")
                .field("tenant_id", &azure_ad.tenant_id)
                .field("client_id", &azure_ad.client_id)
                .finish_non_exhaustive(),
            Credentials::ApiKey { .. } => f.write_str("ApiKey { .. }"),
            Credentials::Empty {} => f.write_str("Empty"),
        }
    }
}

/// Service-account identifiers already known before prompting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAccountHints {
    pub project_id: Option<String>,
    pub billing_account_id: Option<String>,
    pub bigquery_dataset_id: Option<String>,
}

/// Gathers provider-specific credential material. Performs no network I/O.
pub struct CredentialCollector<'a> {
    prompter: &'a mut dyn CredentialPrompter,
}

impl<'a> CredentialCollector<'a> {
    pub fn new(prompter: &'a mut dyn CredentialPrompter) -> Self {
        Self { prompter }
    }

    /// Decides the connection method for a provider.
    ///
    /// GCP is always a service-account connection. Gemini is one when a
    /// service-account file was supplied or the user picks that mode.
    pub fn resolve_method(
        &mut self,
        provider: &ProviderId,
        service_account_file: Option<&Path>,
    ) -> BimoResult<ConnectionMethod> {
        let method = match provider {
            ProviderId::Gcp => ConnectionMethod::OAuth,
            ProviderId::Gemini if service_account_file.is_some() => ConnectionMethod::OAuth,
            ProviderId::Gemini => {
                let mode = self.prompter.gemini_mode().map_err(BimoError::Prompt)?;
                if mode.eq_ignore_ascii_case("service_account") {
                    ConnectionMethod::OAuth
                } else {
                    ConnectionMethod::ApiKey
                }
            }
            _ => ConnectionMethod::ApiKey,
        };
        Ok(method)
    }

    /// Collects credentials for every non-service-account connection.
    pub fn collect_key_based(&mut self, provider: &ProviderId) -> BimoResult<Credentials> {
        let credentials = match provider {
            ProviderId::Azure => Credentials::AzureAd {
                azure_ad: AzureAdCredentials {
                    tenant_id: self.ask(PromptField::AzureTenantId)?,
                    client_id: self.ask(PromptField::AzureClientId)?,
                    client_secret: self.ask(PromptField::AzureClientSecret)?,
                },
            },
            ProviderId::Other(_) => {
                let key = self.prompter.api_key(provider).map_err(BimoError::Prompt)?;
                if key.is_empty() {
                    Credentials::Empty {}
                } else {
                    Credentials::api_key(key)
                }
            }
            _ => Credentials::api_key(self.prompter.api_key(provider).map_err(BimoError::Prompt)?),
        };
        Ok(credentials)
    }

    /// Loads service-account JSON from `file`, or asks for it to be pasted.
    ///
    /// A supplied file that cannot be read or is not JSON aborts the connect
    /// attempt; there is no fallback to pasting.
    pub fn service_account_json(&mut self, file: Option<&Path>) -> BimoResult<String> {
        match file {
            Some(path) => read_service_account_file(path),
            None => self
                .prompter
                .service_account_json()
                .map_err(BimoError::Prompt),
        }
    }

    /// Fills in whatever `hints` lacks by prompting.
    pub fn complete_service_account(
        &mut self,
        service_account_json: String,
        hints: ServiceAccountHints,
    ) -> BimoResult<Credentials> {
        let project_id = match hints.project_id {
            Some(project) => project,
            None => self.prompter.project_id().map_err(BimoError::Prompt)?,
        };
        let billing_account_id = match hints.billing_account_id {
            Some(billing) => billing,
            None => self.prompter.billing_account_id().map_err(BimoError::Prompt)?,
        };
        let bigquery_dataset_id = match hints.bigquery_dataset_id {
            Some(dataset) => dataset,
            None => {
                let answer = self.prompter.bigquery_dataset_id().map_err(BimoError::Prompt)?;
                if answer.is_empty() {
                    DEFAULT_BIGQUERY_DATASET.to_string()
                } else {
                    answer
                }
            }
        };

        Ok(Credentials::ServiceAccount(ServiceAccountCredentials {
            service_account_json,
            project_id,
            billing_account_id,
            bigquery_dataset_id,
        }))
    }

    fn ask(&mut self, field: PromptField) -> BimoResult<String> {
        self.prompter.prompt(field).map_err(BimoError::Prompt)
    }
}

/// Reads and validates a service-account file, returning compact JSON.
pub fn read_service_account_file(path: &Path) -> BimoResult<String> {
    let raw = std::fs::read_to_string(path).map_err(|err| BimoError::CredentialSource {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let parsed: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| BimoError::CredentialSource {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    debug!(path = %path.display(), "Loaded service account file");
    Ok(parsed.to_string())
}

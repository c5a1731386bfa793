//! Provider connection workflow.
//!
//! One invocation: resolve the connection type, gather credentials, optionally
//! auto-detect GCP billing identifiers, build the request, submit it once.

pub mod request;

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use crate::credentials::{CredentialCollector, CredentialPrompter, ServiceAccountHints};
use crate::error::{BimoError, BimoResult};
use crate::gateway::GatewayClient;
use crate::google::{
    AutoDetectionResult, AutoDetector, BIGQUERY_READONLY_SCOPE, CLOUD_BILLING_READONLY_SCOPE,
    JwtBearerExchanger, ServiceAccountRecord,
};
use crate::providers::{ConnectionMethod, ConnectionType, ProviderId};

pub use request::{ConnectionRequest, PreparedConnection};

/// Inputs from the `connect` command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub provider: String,
    pub service_account_file: Option<PathBuf>,
    pub smart_connect: bool,
    pub key_type: Option<String>,
}

/// What a successful connect produced.
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub provider_id: ProviderId,
    pub connection_id: String,
    pub auto_detected: AutoDetectionResult,
}

/// Orchestrates credential collection, smart connect, and submission.
pub struct ConnectFlow<'a> {
    gateway: &'a GatewayClient,
    exchanger: &'a JwtBearerExchanger,
    detector: &'a AutoDetector,
}

impl<'a> ConnectFlow<'a> {
    pub fn new(
        gateway: &'a GatewayClient,
        exchanger: &'a JwtBearerExchanger,
        detector: &'a AutoDetector,
    ) -> Self {
        Self {
            gateway,
            exchanger,
            detector,
        }
    }

    /// Prepares and submits the connection.
    #[instrument(skip_all, fields(provider = %options.provider))]
    pub async fn run(
        &self,
        options: &ConnectOptions,
        prompter: &mut dyn CredentialPrompter,
    ) -> BimoResult<ConnectOutcome> {
        let (prepared, auto_detected) = self.prepare(options, prompter).await?;
        let response = self.gateway.connect_provider(&prepared).await?;
        let connection_id = response.display_id().to_string();
        info!(connection_id = %connection_id, "Provider connected");
        Ok(ConnectOutcome {
            provider_id: prepared.request.provider_id,
            connection_id,
            auto_detected,
        })
    }

    /// Everything up to, but excluding, the gateway submission.
    pub async fn prepare(
        &self,
        options: &ConnectOptions,
        prompter: &mut dyn CredentialPrompter,
    ) -> BimoResult<(PreparedConnection, AutoDetectionResult)> {
        if options.provider.trim().is_empty() {
            return Err(BimoError::MissingProvider);
        }
        let provider = ProviderId::normalize(&options.provider);

        let key_type = match options.key_type.as_deref() {
            Some(raw) => raw.to_string(),
            None => prompter.key_type().map_err(BimoError::Prompt)?,
        };
        let connection_type = ConnectionType::parse_lenient(&key_type);

        let mut collector = CredentialCollector::new(prompter);
        let file = options.service_account_file.as_deref();
        let method = collector.resolve_method(&provider, file)?;

        let mut auto_detected = AutoDetectionResult::default();
        let credentials = if provider.is_google() && method == ConnectionMethod::OAuth {
            let service_account_json = collector.service_account_json(file)?;
            let record = ServiceAccountRecord::inspect(&service_account_json);
            if let Some(project) = record.project_id.as_deref() {
                debug!(project_id = %project, "Detected project from service account");
            }

            if options.smart_connect && !service_account_json.is_empty() {
                auto_detected = self.auto_detect(&record).await;
            }

            let hints = ServiceAccountHints {
                project_id: record.project_id.clone(),
                billing_account_id: auto_detected.billing_account_id.clone(),
                bigquery_dataset_id: auto_detected.bigquery_dataset_id.clone(),
            };
            collector.complete_service_account(service_account_json, hints)?
        } else {
            collector.collect_key_based(&provider)?
        };

        let prepared = request::build(
            provider,
            method,
            credentials,
            connection_type,
            request::new_idempotency_key(),
        );
        Ok((prepared, auto_detected))
    }

    /// Token exchange plus billing/dataset lookup. Never fails; anything that
    /// goes wrong leaves the corresponding value absent.
    ///
    /// Runs before any prompt, so both identifiers are always sought.
    async fn auto_detect(&self, record: &ServiceAccountRecord) -> AutoDetectionResult {
        let Some(project_id) = record.project_id.as_deref() else {
            debug!("Skipping auto-detection: service account has no project_id");
            return AutoDetectionResult::default();
        };
        if !record.supports_auto_detection() {
            debug!("Skipping auto-detection: service account lacks client_email or private_key");
            return AutoDetectionResult::default();
        }

        let scopes = [CLOUD_BILLING_READONLY_SCOPE, BIGQUERY_READONLY_SCOPE];
        let Some(token) = self.exchanger.exchange(record, &scopes).await else {
            return AutoDetectionResult::default();
        };
        self.detector.detect(project_id, &token, true, true).await
    }
}

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bimo::connect::{ConnectFlow, ConnectOptions};
use bimo::credentials::{CannedPrompter, Credentials, PromptField};
use bimo::error::BimoError;
use bimo::gateway::GatewayClient;
use bimo::google::{
    AutoDetector, BIGQUERY_READONLY_SCOPE, CLOUD_BILLING_READONLY_SCOPE, JwtBearerExchanger,
};
use bimo::providers::{ConnectionMethod, ConnectionType, ProviderId};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header_exists, method, path},
};

mod test_utils;
use test_utils::{
    mount_billing_info, mount_datasets, mount_token_endpoint, service_account_json, test_client,
    write_file,
};

struct Harness {
    google: MockServer,
    gateway_server: MockServer,
    gateway: GatewayClient,
    exchanger: JwtBearerExchanger,
    detector: AutoDetector,
}

impl Harness {
    async fn start() -> Self {
        let google = MockServer::start().await;
        let gateway_server = MockServer::start().await;
        let gateway = GatewayClient::with_client(
            test_client(),
            &format!("{}/v1", gateway_server.uri()),
            Some("session-token".to_string()),
        );
        let exchanger =
            JwtBearerExchanger::with_client(test_client(), format!("{}/token", google.uri()));
        let detector = AutoDetector::with_client(test_client(), google.uri(), google.uri());
        Self {
            google,
            gateway_server,
            gateway,
            exchanger,
            detector,
        }
    }

    fn flow(&self) -> ConnectFlow<'_> {
        ConnectFlow::new(&self.gateway, &self.exchanger, &self.detector)
    }

    async fn accept_connect(&self, provider: &str, connection_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/providers/{provider}/connect")))
            .and(header_exists("Idempotency-Key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"connection_id": connection_id})),
            )
            .mount(&self.gateway_server)
            .await;
    }

    async fn sent_body(&self) -> Value {
        let requests = self.gateway_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1, "exactly one connect request");
        requests[0].body_json().unwrap()
    }
}

#[tokio::test]
async fn smart_connect_uses_detected_values_without_prompting() {
    let harness = Harness::start().await;
    mount_token_endpoint(&harness.google, "ya29.fixture").await;
    mount_billing_info(&harness.google, "demo-project", "0123AB-CDEF45-6789GH").await;
    mount_datasets(&harness.google, "demo-project", &["raw", "billing_export_v1"]).await;
    harness.accept_connect("gemini", "conn-42").await;

    let dir = TempDir::new().unwrap();
    let sa_path = write_file(&dir, "sa.json", &service_account_json("demo-project")).unwrap();
    let options = ConnectOptions {
        provider: "vertex".to_string(),
        service_account_file: Some(sa_path),
        smart_connect: true,
        key_type: None,
    };
    let mut prompter = CannedPrompter::new().answer(PromptField::KeyType, "developer");

    let outcome = harness.flow().run(&options, &mut prompter).await.unwrap();

    assert_eq!(outcome.connection_id, "conn-42");
    assert_eq!(outcome.provider_id, ProviderId::Gemini);
    assert_eq!(prompter.asked(), &[PromptField::KeyType]);

    let body = harness.sent_body().await;
    assert_eq!(body["provider_id"], "gemini");
    assert_eq!(body["method"], "oauth");
    assert_eq!(body["connection_type"], "developer");
    assert_eq!(body["connection_source"], "cli");
    assert_eq!(body["credentials"]["project_id"], "demo-project");
    assert_eq!(body["credentials"]["billing_account_id"], "0123AB-CDEF45-6789GH");
    assert_eq!(body["credentials"]["bigquery_dataset_id"], "billing_export_v1");
    let sent_sa: Value =
        serde_json::from_str(body["credentials"]["service_account_json"].as_str().unwrap())
            .unwrap();
    assert_eq!(sent_sa["client_email"], test_utils::TEST_CLIENT_EMAIL);
}

#[tokio::test]
async fn smart_connect_requests_billing_and_bigquery_scopes_once() {
    let harness = Harness::start().await;
    mount_token_endpoint(&harness.google, "ya29.fixture").await;
    mount_billing_info(&harness.google, "demo-project", "B-9").await;
    mount_datasets(&harness.google, "demo-project", &["billing_export"]).await;

    let dir = TempDir::new().unwrap();
    let sa_path = write_file(&dir, "sa.json", &service_account_json("demo-project")).unwrap();
    let options = ConnectOptions {
        provider: "gemini".to_string(),
        service_account_file: Some(sa_path),
        smart_connect: true,
        key_type: Some("production".to_string()),
    };
    let mut prompter = CannedPrompter::new();

    harness.flow().prepare(&options, &mut prompter).await.unwrap();

    let token_requests: Vec<_> = harness
        .google
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/token")
        .collect();
    assert_eq!(token_requests.len(), 1);

    let form = String::from_utf8(token_requests[0].body.clone()).unwrap();
    let assertion = form
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .unwrap();
    let claims = assertion.split('.').nth(1).unwrap();
    let claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims).unwrap()).unwrap();
    assert_eq!(
        claims["scope"],
        format!("{CLOUD_BILLING_READONLY_SCOPE} {BIGQUERY_READONLY_SCOPE}")
    );
}

#[tokio::test]
async fn failed_exchange_falls_back_to_prompts() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&harness.google)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.google)
        .await;
    harness.accept_connect("gcp", "conn-7").await;

    let dir = TempDir::new().unwrap();
    let sa_path = write_file(&dir, "sa.json", &service_account_json("demo-project")).unwrap();
    let options = ConnectOptions {
        provider: "gcp".to_string(),
        service_account_file: Some(sa_path),
        smart_connect: true,
        key_type: Some("production".to_string()),
    };
    let mut prompter = CannedPrompter::new()
        .answer(PromptField::BillingAccountId, "MANUAL-BILLING")
        .answer(PromptField::BigQueryDatasetId, "");

    let outcome = harness.flow().run(&options, &mut prompter).await.unwrap();

    assert_eq!(outcome.connection_id, "conn-7");
    assert_eq!(outcome.auto_detected.billing_account_id, None);
    assert!(!prompter.was_asked(&PromptField::KeyType));
    assert!(!prompter.was_asked(&PromptField::ProjectId));
    assert_eq!(
        prompter.asked(),
        &[PromptField::BillingAccountId, PromptField::BigQueryDatasetId]
    );

    let body = harness.sent_body().await;
    assert_eq!(body["credentials"]["billing_account_id"], "MANUAL-BILLING");
    assert_eq!(body["credentials"]["bigquery_dataset_id"], "billing_export");
}

#[tokio::test]
async fn without_smart_connect_google_is_never_called() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.google)
        .await;

    let dir = TempDir::new().unwrap();
    let sa_path = write_file(&dir, "sa.json", &service_account_json("demo-project")).unwrap();
    let options = ConnectOptions {
        provider: "gemini".to_string(),
        service_account_file: Some(sa_path),
        smart_connect: false,
        key_type: Some("production".to_string()),
    };
    let mut prompter = CannedPrompter::new()
        .answer(PromptField::BillingAccountId, "B-1")
        .answer(PromptField::BigQueryDatasetId, "exports");

    let (prepared, detected) = harness.flow().prepare(&options, &mut prompter).await.unwrap();

    assert_eq!(detected.billing_account_id, None);
    assert_eq!(prepared.request.method, ConnectionMethod::OAuth);
    match &prepared.request.credentials {
        Credentials::ServiceAccount(sa) => {
            assert_eq!(sa.project_id, "demo-project");
            assert_eq!(sa.billing_account_id, "B-1");
            assert_eq!(sa.bigquery_dataset_id, "exports");
        }
        other => panic!("unexpected credentials: {other:?}"),
    }
}

#[tokio::test]
async fn missing_service_account_file_aborts_before_gateway() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.gateway_server)
        .await;

    let dir = TempDir::new().unwrap();
    let options = ConnectOptions {
        provider: "gemini".to_string(),
        service_account_file: Some(dir.path().join("missing.json")),
        smart_connect: true,
        key_type: Some("production".to_string()),
    };
    let mut prompter = CannedPrompter::new();

    let err = harness.flow().run(&options, &mut prompter).await.unwrap_err();

    assert!(matches!(err, BimoError::CredentialSource { .. }));
    assert!(err.to_string().contains("missing.json"));
    assert!(!prompter.was_asked(&PromptField::ServiceAccountJson));
}

#[tokio::test]
async fn blank_provider_is_rejected_before_prompting() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.gateway_server)
        .await;

    let options = ConnectOptions {
        provider: "   ".to_string(),
        ..ConnectOptions::default()
    };
    let mut prompter = CannedPrompter::new();

    let err = harness.flow().run(&options, &mut prompter).await.unwrap_err();

    assert!(matches!(err, BimoError::MissingProvider));
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn api_key_provider_with_lenient_key_type() {
    let harness = Harness::start().await;
    harness.accept_connect("claude", "conn-c").await;

    let options = ConnectOptions {
        provider: "Anthropic".to_string(),
        key_type: Some("staging".to_string()),
        ..ConnectOptions::default()
    };
    let mut prompter =
        CannedPrompter::new().answer(PromptField::ApiKey(ProviderId::Claude), "  sk-ant-1  ");

    harness.flow().run(&options, &mut prompter).await.unwrap();

    let body = harness.sent_body().await;
    assert_eq!(
        body,
        json!({
            "provider_id": "claude",
            "method": "api_key",
            "credentials": {"api_key": "sk-ant-1"},
            "connection_type": "production",
            "connection_source": "cli"
        })
    );
}

#[tokio::test]
async fn azure_collects_ad_credentials() {
    let harness = Harness::start().await;
    let options = ConnectOptions {
        provider: "azure".to_string(),
        key_type: Some("Developer".to_string()),
        ..ConnectOptions::default()
    };
    let mut prompter = CannedPrompter::new()
        .answer(PromptField::AzureTenantId, "tenant")
        .answer(PromptField::AzureClientId, "client");

    let (prepared, _) = harness.flow().prepare(&options, &mut prompter).await.unwrap();

    assert_eq!(prepared.request.connection_type, ConnectionType::Developer);
    assert_eq!(
        serde_json::to_value(&prepared.request.credentials).unwrap(),
        json!({"azureAd": {"tenantId": "tenant", "clientId": "client", "clientSecret": ""}})
    );
}

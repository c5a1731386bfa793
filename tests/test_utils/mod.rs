//! Shared fixtures for integration tests: service-account keys, HTTP
//! clients with short timeouts, and canned Google endpoint mocks.

#![allow(dead_code)]

use std::{fs, path::PathBuf, time::Duration};

use anyhow::Result;
use bimo::config::AppConfig;
use bimo::http_client::build_http_client;
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const TEST_CLIENT_EMAIL: &str = "billing-reader@demo-project.iam.gserviceaccount.com";

/// Service-account JSON signed by the fixture key.
pub fn service_account_json(project_id: &str) -> String {
    json!({
        "type": "service_account",
        "project_id": project_id,
        "private_key_id": "fixture",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": TEST_CLIENT_EMAIL,
        "token_uri": "https://oauth2.googleapis.com/token"
    })
    .to_string()
}

/// Writes `contents` to `name` inside `dir`, returning the path.
pub fn write_file(dir: &TempDir, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

pub fn test_client() -> Client {
    build_http_client(Duration::from_secs(5)).expect("http client builds")
}

/// Config pointing every Google endpoint at `google` and the session at `dir`.
pub fn config_for(google: &MockServer, dir: &TempDir) -> AppConfig {
    AppConfig {
        http_timeout_secs: 5,
        google_token_url: format!("{}/token", google.uri()),
        cloud_billing_base: google.uri(),
        bigquery_base: google.uri(),
        config_dir: Some(dir.path().to_path_buf()),
        ..AppConfig::default()
    }
}

/// Token endpoint accepting the JWT-bearer grant.
pub async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
}

pub async fn mount_billing_info(server: &MockServer, project_id: &str, billing_account: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{project_id}/billingInfo")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("projects/{project_id}/billingInfo"),
            "projectId": project_id,
            "billingAccountName": format!("billingAccounts/{billing_account}"),
            "billingEnabled": true
        })))
        .mount(server)
        .await;
}

pub async fn mount_datasets(server: &MockServer, project_id: &str, dataset_ids: &[&str]) {
    let datasets: Vec<_> = dataset_ids
        .iter()
        .map(|id| {
            json!({
                "id": format!("{project_id}:{id}"),
                "datasetReference": { "projectId": project_id, "datasetId": id }
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/bigquery/v2/projects/{project_id}/datasets")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "datasets": datasets })))
        .mount(server)
        .await;
}

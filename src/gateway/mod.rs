//! HTTP client for the bimo gateway.
//!
//! Every request carries `X-BIMO-SOURCE: dev` and, when a session token
//! exists, `Authorization: Bearer <token>`. Non-2xx responses become
//! [`BimoError::Gateway`]. Nothing here retries.

pub mod types;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::AppConfig;
use crate::connect::request::PreparedConnection;
use crate::error::{BimoError, BimoResult};
use crate::http_client::build_http_client;

pub use types::{
    ConnectResponse, DevicePollResponse, DeviceStartResponse, EnvExport, ProviderConnection,
    UsageReport,
};

/// Source tag the gateway uses to mark CLI traffic.
pub const SOURCE_HEADER: &str = "X-BIMO-SOURCE";
const SOURCE_VALUE: &str = "dev";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Client bound to one gateway base URL and optional session token.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &AppConfig, base_url: &str, token: Option<String>) -> BimoResult<Self> {
        Ok(Self::with_client(
            build_http_client(config.http_timeout())?,
            base_url,
            token,
        ))
    }

    pub fn with_client(http_client: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// `{base}/{segments..}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> BimoResult<Url> {
        let invalid = |source| BimoError::InvalidUrl {
            value: self.base_url.clone(),
            source,
        };
        let mut url = Url::parse(&self.base_url).map_err(invalid)?;
        url.path_segments_mut()
            .map_err(|_| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header(SOURCE_HEADER, SOURCE_VALUE)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send_text(&self, builder: RequestBuilder) -> BimoResult<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BimoError::from_gateway_body(status, &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> BimoResult<T> {
        let body = self.send_text(builder).await?;
        // An empty 2xx body reads as an empty object.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|err| BimoError::InvalidResponse(format!("unexpected gateway response: {err}")))
    }

    /// Starts a device-code login.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn start_device(&self) -> BimoResult<DeviceStartResponse> {
        let url = self.endpoint(&["cli", "device", "start"])?;
        let response = self.send_json(self.request(Method::POST, url)).await?;
        debug!("Device login started");
        Ok(response)
    }

    /// Polls a device-code login once.
    #[instrument(skip_all)]
    pub async fn poll_device(&self, device_code: &str) -> BimoResult<DevicePollResponse> {
        let url = self.endpoint(&["cli", "device", "poll"])?;
        self.send_json(
            self.request(Method::POST, url)
                .json(&serde_json::json!({ "device_code": device_code })),
        )
        .await
    }

    /// Submits a connection request with its idempotency key.
    ///
    /// The connection exists once the gateway answers 2xx, so a body without
    /// a readable id yields [`ConnectResponse::default`].
    #[instrument(skip_all, fields(provider = %prepared.request.provider_id, idempotency_key = %prepared.idempotency_key))]
    pub async fn connect_provider(
        &self,
        prepared: &PreparedConnection,
    ) -> BimoResult<ConnectResponse> {
        let provider = prepared.request.provider_id.as_str();
        let url = self.endpoint(&["providers", provider, "connect"])?;
        let builder = self
            .request(Method::POST, url)
            .header(IDEMPOTENCY_HEADER, prepared.idempotency_key.to_string())
            .json(&prepared.request);
        let body = self.send_text(builder).await?;
        match serde_json::from_str(&body) {
            Ok(response) => Ok(response),
            Err(err) => {
                debug!(error = %err, "Connect response carried no readable id");
                Ok(ConnectResponse::default())
            }
        }
    }

    /// Fetches the environment values for `.env` export.
    pub async fn env(&self) -> BimoResult<EnvExport> {
        let url = self.endpoint(&["env"])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    /// Lists existing provider connections. A missing or non-array `data` is empty.
    pub async fn list_connections(&self) -> BimoResult<Vec<ProviderConnection>> {
        let url = self.endpoint(&["providers", "connections"])?;
        let list: types::ConnectionList = self.send_json(self.request(Method::GET, url)).await?;
        match list.data {
            serde_json::Value::Array(_) => serde_json::from_value(list.data)
                .map_err(|err| BimoError::InvalidResponse(format!("connection list: {err}"))),
            _ => Ok(Vec::new()),
        }
    }

    /// Usage for one connection over the last `days` days.
    pub async fn usage(&self, connection_id: &str, days: u32) -> BimoResult<UsageReport> {
        let mut url = self.endpoint(&["providers", connection_id, "usage"])?;
        url.query_pairs_mut()
            .append_pair("days", &days.to_string());
        self.send_json(self.request(Method::GET, url)).await
    }
}

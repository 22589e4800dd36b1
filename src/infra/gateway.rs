//! Asynchronous client for the Parcify parcel API.
//!
//! - Posts `{"parcel": ...}` with basic auth and reports the outcome as a
//!   [`GatewayResponse`]; no failure is raised to the caller.
//! - Anything but HTTP 200 is normalized to the `-` failure status with a
//!   generic message. The raw exchange goes to the debug sink.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::Parcel;
use crate::infra::debug_log::{DebugRecord, DebugSink, TransportFailure};
use crate::util::settings::{CarrierConfig, SecretDecryptor};
use crate::util::version::user_agent;

pub const SUCCESS_CODE: &str = "200";
pub const FAILURE_CODE: &str = "-";

pub const MISSING_URL: &str = "Parcify Shipping - Missing Gateway URL";
pub const MISSING_USER_ID: &str = "Parcify Shipping - Missing Gateway user ID";
pub const MISSING_PASSWORD: &str = "Parcify Shipping - Missing Gateway password";
pub const REJECTED_MESSAGE: &str =
    "Error Parcify parcel create API, check the \"shipping_parcify.log\" files for details.";
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Error Parcify parcel create API";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    fn code(&self) -> String {
        match self {
            GatewayError::InvalidUrl(_) => "invalid_url".to_string(),
            GatewayError::Http(err) if err.is_timeout() => "timeout".to_string(),
            GatewayError::Http(err) if err.is_connect() => "connect".to_string(),
            GatewayError::Http(err) => err
                .status()
                .map(|status| status.as_u16().to_string())
                .unwrap_or_else(|| "request".to_string()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl GatewayCredentials {
    /// The carrier user id doubles as the basic-auth username.
    pub fn from_config(config: &CarrierConfig, secrets: &dyn SecretDecryptor) -> Self {
        let password = if config.password.is_empty() {
            String::new()
        } else {
            secrets.decrypt(&config.password)
        };
        Self {
            url: config.gateway_url.trim().to_string(),
            username: config.user_id.trim().to_string(),
            password,
        }
    }

    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.url.is_empty() {
            missing.push(MISSING_URL.to_string());
        }
        if self.username.is_empty() {
            missing.push(MISSING_USER_ID.to_string());
        }
        if self.password.trim().is_empty() {
            missing.push(MISSING_PASSWORD.to_string());
        }
        missing
    }
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GatewayStatus {
    Success,
    Failure,
}

impl GatewayStatus {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayStatus::Success => SUCCESS_CODE,
            GatewayStatus::Failure => FAILURE_CODE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelCreated {
    #[serde(
        rename = "parcelId",
        default,
        deserialize_with = "optional_id_from_json"
    )]
    pub parcel_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ResponseBody {
    Created(ParcelCreated),
    Errors(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub status: GatewayStatus,
    pub body: Option<ResponseBody>,
}

impl GatewayResponse {
    pub fn created(body: ParcelCreated) -> Self {
        Self {
            status: GatewayStatus::Success,
            body: Some(ResponseBody::Created(body)),
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            status: GatewayStatus::Failure,
            body: Some(ResponseBody::Errors(errors)),
        }
    }

    pub fn code(&self) -> &'static str {
        self.status.code()
    }

    pub fn is_success(&self) -> bool {
        self.code() == SUCCESS_CODE
    }

    pub fn parcel_id(&self) -> Option<&str> {
        match &self.body {
            Some(ResponseBody::Created(created)) => created.parcel_id.as_deref(),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[String] {
        match &self.body {
            Some(ResponseBody::Errors(errors)) => errors,
            _ => &[],
        }
    }
}

#[async_trait]
pub trait ParcelGateway: Send + Sync {
    async fn submit_parcel(
        &self,
        parcel: &Parcel,
        credentials: &GatewayCredentials,
    ) -> GatewayResponse;
}

#[derive(Serialize)]
struct ParcelEnvelope<'a> {
    parcel: &'a Parcel,
}

#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    debug: bool,
    sink: Arc<dyn DebugSink>,
}

impl HttpGateway {
    pub fn new(config: &CarrierConfig, sink: Arc<dyn DebugSink>) -> Result<Self, GatewayError> {
        if !config.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for the Parcify gateway");
        }
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self {
            http,
            debug: config.debug,
            sink,
        })
    }

    async fn exchange(
        &self,
        parcel: &Parcel,
        credentials: &GatewayCredentials,
        record: &mut DebugRecord,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = Url::parse(&credentials.url)?;
        let response = self
            .http
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&ParcelEnvelope { parcel })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        record.code = Some(status.as_u16());
        record.body = Some(body.clone());

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Parcify gateway rejected parcel");
            return Ok(GatewayResponse::failure(vec![REJECTED_MESSAGE.to_string()]));
        }

        match serde_json::from_str::<ParcelCreated>(&body) {
            Ok(created) => Ok(GatewayResponse::created(created)),
            Err(err) => {
                tracing::warn!("Parcify gateway returned an undecodable body: {err}");
                Ok(GatewayResponse {
                    status: GatewayStatus::Success,
                    body: None,
                })
            }
        }
    }
}

#[async_trait]
impl ParcelGateway for HttpGateway {
    async fn submit_parcel(
        &self,
        parcel: &Parcel,
        credentials: &GatewayCredentials,
    ) -> GatewayResponse {
        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(missing = missing.len(), "Parcify gateway settings incomplete");
            return GatewayResponse::failure(missing);
        }

        tracing::debug!(url = %credentials.url, package = %parcel.package.name, "Submitting Parcify parcel");
        let mut record = DebugRecord::new(credentials.url.clone());
        let response = match self.exchange(parcel, credentials, &mut record).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("Parcify gateway request failed: {err}");
                record.failure = Some(TransportFailure {
                    error: err.to_string(),
                    code: err.code(),
                });
                GatewayResponse::failure(vec![TRANSPORT_FAILURE_MESSAGE.to_string()])
            }
        };

        if self.debug {
            self.sink.record(&record);
        }
        response
    }
}

/// Accepts string or numeric ids; empty strings count as absent.
fn optional_id_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

//! The seam between the workflows and the console's REST API.
//!
//! Everything above this module builds [`ApiRequest`]s and interprets
//! [`ApiResponse`]s, so the workflows can be driven by a scripted transport in
//! tests. [`RestClient`] is the real thing.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    Method,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::ApiConfig, error::ApiError};

/// Everything but unreserved characters and `/` gets escaped, so a space is
/// `%20` and never `+`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the host, starting with `/api/`.
    pub path: String,
    /// Query parameters, unencoded. See [`ApiRequest::target`].
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The path with the percent-encoded query string appended.
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_VALUE),
                    utf8_percent_encode(value, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body, treating any non-2xx status as an error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.ok()?;
        Ok(serde_json::from_str(&self.body)?)
    }

    /// For responses where only the status matters.
    pub fn ok(&self) -> Result<(), ApiError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }
}

/// Sends one request and waits for the whole response.
///
/// A non-2xx status is not an error at this level, only failing to get a
/// response at all is.
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct RestClient {
    client: reqwest::Client,
    host: String,
}

impl RestClient {
    pub fn new(config: &ApiConfig) -> eyre::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("sec"), HeaderValue::from_str(&config.token)?);
        headers.insert(
            HeaderName::from_static("version"),
            HeaderValue::from_str(&config.version)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if config.insecure_skip_verify {
            warn!(
                "TLS certificate verification is disabled for {} (api.insecure_skip_verify)",
                config.host
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }
}

impl Transport for RestClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.target());
        debug!("{} {url}", request.method);

        let mut builder = self.client.request(request.method, url);
        if let Some(body) = &request.body {
            // also sets content-type: application/json
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(ApiResponse { status, body })
    }
}

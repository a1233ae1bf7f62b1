//! The HTTP layer under `RpcClient`.
//!
//! `Transport` is the seam tests replace: it takes an encoded request body and
//! hands back the raw status and body, leaving envelope handling to the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::ApiError;

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Header carrying the method name alongside the JSON body.
const API_METHOD_HEADER: &str = "x-api-method";

#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: &'static str,
    /// Encoded JSON-RPC envelope.
    pub body: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST one request. Returns the response for any 2xx status; other
    /// statuses and network failures are errors.
    async fn post(&self, request: WireRequest) -> Result<WireResponse, ApiError>;
}

/// reqwest-backed transport posting to a single endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Transport {
                method: "client setup".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(request: &WireRequest) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            API_METHOD_HEADER,
            header::HeaderValue::from_static(request.method),
        );
        if let Some(ref token) = request.auth_token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(
                |e| ApiError::InvalidRequest {
                    method: request.method.to_string(),
                    message: format!("invalid auth token: {}", e),
                },
            )?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn transport_error(method: &str, err: reqwest::Error) -> ApiError {
        let message = if err.is_timeout() {
            format!("timed out after {}s", REQUEST_TIMEOUT_SECS)
        } else {
            err.to_string()
        };
        ApiError::Transport {
            method: method.to_string(),
            message,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: WireRequest) -> Result<WireResponse, ApiError> {
        let headers = Self::headers(&request)?;

        // One attempt per call; a failure here ends the call
        debug!(method = request.method, endpoint = %self.endpoint, "POST");
        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| Self::transport_error(request.method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(request.method, e))?;

        if !status.is_success() {
            return Err(ApiError::from_status(request.method, status.as_u16(), &body));
        }

        Ok(WireResponse {
            status: status.as_u16(),
            body,
        })
    }
}

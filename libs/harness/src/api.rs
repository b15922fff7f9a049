//! HTTP client for the management API.
//!
//! Every request carries a timeout, so a hung call surfaces as a transport
//! error instead of stalling the poll that issued it.

use std::time::Duration;

use pat_converge::{HttpResponse, ResponseBody};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::TestContext;
use crate::error::HarnessError;

/// API client for the platform's management API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the context's API URL.
    pub fn new(
        context: &TestContext,
        token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, HarnessError> {
        Self::with_base_url(
            context.api_url(),
            token,
            context.skip_ssl_validation(),
            request_timeout,
        )
    }

    /// Create a client for an explicit base URL.
    pub fn with_base_url(
        base_url: &str,
        token: Option<&str>,
        skip_ssl_validation: bool,
        request_timeout: Duration,
    ) -> Result<Self, HarnessError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("bearer {token}"))
                    .map_err(|_| HarnessError::config("invalid token format"))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(skip_ssl_validation)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HarnessError> {
        let response = self.client.get(self.url(path)).send().await?;

        self.handle_response(response).await
    }

    /// Make a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HarnessError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;

        self.handle_response(response).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<(), HarnessError> {
        let response = self.client.delete(self.url(path)).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error(response).await
        }
    }

    /// Make a request and return the response whatever its status.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, HarnessError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        debug!(%method, path, status = response.status().as_u16(), "API request");

        capture(response).await
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, HarnessError> {
        if response.status().is_success() {
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle an error response.
    async fn handle_error<T>(&self, response: reqwest::Response) -> Result<T, HarnessError> {
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        Err(HarnessError::Api {
            status,
            message: error_message(&body),
        })
    }
}

/// Convert a response into an observation payload.
pub(crate) async fn capture(response: reqwest::Response) -> Result<HttpResponse, HarnessError> {
    let status = response.status().as_u16();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let bytes = response.bytes().await?;

    Ok(headers
        .into_iter()
        .fold(
            HttpResponse::new(status, ResponseBody::from_bytes(&bytes)),
            |response, (name, value)| response.with_header(&name, value),
        ))
}

/// Pull a human-readable message out of an API error body.
fn error_message(body: &Value) -> String {
    ["/errors/0/detail", "/description", "/message", "/error_description"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string()
}

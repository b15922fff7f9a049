//! HTTP probe for application routes.
//!
//! Requests go to `http://{host}.{apps_domain}{path}`. When a router address
//! is configured, the request is sent there instead and the route travels
//! in the `Host` header.

use std::time::Duration;

use pat_converge::HttpResponse;
use reqwest::header::{COOKIE, HOST};
use tracing::debug;

use crate::api::capture;
use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// Issues plain GET requests against app routes.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    apps_domain: String,
    router_url: Option<String>,
}

impl HttpProbe {
    pub fn new(
        apps_domain: impl Into<String>,
        router_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            apps_domain: apps_domain.into(),
            router_url: router_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    pub fn from_config(config: &HarnessConfig, request_timeout: Duration) -> Result<Self, HarnessError> {
        Self::new(
            config.apps_domain.clone(),
            config.router_url.clone(),
            request_timeout,
        )
    }

    /// Fully qualified route host.
    pub fn route_host(&self, host: &str) -> String {
        format!("{}.{}", host, self.apps_domain)
    }

    /// URL a browser would use for the route.
    pub fn route_url(&self, host: &str, path: &str) -> String {
        format!("http://{}{}", self.route_host(host), path)
    }

    /// GET a route, optionally sending a `Cookie` header.
    pub async fn get(
        &self,
        host: &str,
        path: &str,
        cookie: Option<&str>,
    ) -> Result<HttpResponse, HarnessError> {
        let mut request = match &self.router_url {
            Some(router) => self
                .client
                .get(format!("{router}{path}"))
                .header(HOST, self.route_host(host)),
            None => self.client.get(self.route_url(host, path)),
        };
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        debug!(
            route = %self.route_host(host),
            path,
            status = response.status().as_u16(),
            "Probed route"
        );
        capture(response).await
    }
}

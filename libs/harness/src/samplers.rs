//! Samplers backed by the harness collaborators.
//!
//! Collaborator errors never escape a sampler: they become
//! [`Observation::Failure`] so predicates can treat them as transient.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pat_converge::{Observation, Sampler};
use reqwest::Method;
use tracing::debug;

use crate::api::ApiClient;
use crate::cli::CommandRunner;
use crate::context::TestContext;
use crate::probe::HttpProbe;

/// Runs one command per sample.
pub struct CliSampler {
    runner: Arc<dyn CommandRunner>,
    context: TestContext,
    args: Vec<String>,
    call_timeout: Duration,
}

impl CliSampler {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        context: TestContext,
        args: Vec<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            context,
            args,
            call_timeout,
        }
    }
}

#[async_trait]
impl Sampler for CliSampler {
    async fn sample(&self) -> Observation {
        match self
            .runner
            .run(&self.context, &self.args, self.call_timeout)
            .await
        {
            Ok(output) => output.into(),
            Err(err) => {
                debug!(error = %err, "Command sample failed");
                Observation::failure(err.to_string())
            }
        }
    }
}

/// Issues one GET against the management API per sample.
pub struct ApiSampler {
    client: ApiClient,
    path: String,
}

impl ApiSampler {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl Sampler for ApiSampler {
    async fn sample(&self) -> Observation {
        match self.client.request(Method::GET, &self.path, None).await {
            Ok(response) => response.into(),
            Err(err) => {
                debug!(error = %err, path = %self.path, "API sample failed");
                Observation::failure(err.to_string())
            }
        }
    }
}

/// Probes one app route per sample.
pub struct RouteSampler {
    probe: HttpProbe,
    host: String,
    path: String,
    cookie: Option<String>,
}

impl RouteSampler {
    pub fn new(probe: HttpProbe, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            probe,
            host: host.into(),
            path: path.into(),
            cookie: None,
        }
    }

    /// Send this `Cookie` header with every request.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

#[async_trait]
impl Sampler for RouteSampler {
    async fn sample(&self) -> Observation {
        match self
            .probe
            .get(&self.host, &self.path, self.cookie.as_deref())
            .await
        {
            Ok(response) => response.into(),
            Err(err) => {
                debug!(error = %err, host = %self.host, "Route sample failed");
                Observation::failure(err.to_string())
            }
        }
    }
}

//! Per-resource-kind probes.
//!
//! Each kind knows how to sample its resource, how to read an
//! [`AsyncOperationState`] from a sample, and how absence looks. Scenarios
//! pick the probe when they are built; there is no runtime dispatch on
//! resource type.

use std::sync::Arc;
use std::time::Duration;

use pat_converge::predicate::{contains, status};
use pat_converge::{
    await_operation_succeeded, await_resource_absent, await_resource_absent_or_failed,
    AsyncOperationState, LastOperation, PollOutcome, PollPolicy, Predicate, Snapshot,
    StateExtractor,
};
use serde_json::Value;

use crate::api::ApiClient;
use crate::cli::{args, CommandRunner};
use crate::context::TestContext;
use crate::parse::app_instances;
use crate::probe::HttpProbe;
use crate::samplers::{ApiSampler, CliSampler, RouteSampler};

/// Sampler, state extraction and absence check for one resource.
pub trait ResourceProbe {
    type Sampler: pat_converge::Sampler;
    type Extractor: StateExtractor;

    fn sampler(&self) -> Self::Sampler;
    fn extractor(&self) -> Self::Extractor;
    fn absent(&self) -> Box<dyn Predicate>;
    fn describe(&self) -> String;
}

/// Wait for the resource's current operation to succeed.
pub async fn await_ready<R: ResourceProbe>(probe: &R, policy: PollPolicy) -> PollOutcome {
    await_operation_succeeded(&probe.sampler(), probe.extractor(), policy).await
}

/// Wait for the resource to disappear.
pub async fn await_gone<R: ResourceProbe>(probe: &R, policy: PollPolicy) -> PollOutcome {
    await_resource_absent(&probe.sampler(), probe.absent(), policy).await
}

/// Wait for the resource to disappear, stopping if deletion reports failure.
pub async fn await_gone_or_failed<R: ResourceProbe>(probe: &R, policy: PollPolicy) -> PollOutcome {
    await_resource_absent_or_failed(&probe.sampler(), probe.absent(), probe.extractor(), policy)
        .await
}

// =============================================================================
// Command-backed probes
// =============================================================================

/// A brokered service instance, observed through `service <name>`.
#[derive(Clone)]
pub struct ServiceInstance {
    runner: Arc<dyn CommandRunner>,
    context: TestContext,
    name: String,
    call_timeout: Duration,
}

impl ServiceInstance {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        context: TestContext,
        name: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            context,
            name: name.into(),
            call_timeout,
        }
    }
}

impl ResourceProbe for ServiceInstance {
    type Sampler = CliSampler;
    type Extractor = LastOperation;

    fn sampler(&self) -> CliSampler {
        CliSampler::new(
            self.runner.clone(),
            self.context.clone(),
            args(["service", self.name.as_str()]),
            self.call_timeout,
        )
    }

    fn extractor(&self) -> LastOperation {
        LastOperation
    }

    fn absent(&self) -> Box<dyn Predicate> {
        Box::new(contains("not found"))
    }

    fn describe(&self) -> String {
        format!("service instance {}", self.name)
    }
}

/// An application, observed through `app <name>`.
#[derive(Clone)]
pub struct App {
    runner: Arc<dyn CommandRunner>,
    context: TestContext,
    name: String,
    call_timeout: Duration,
}

impl App {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        context: TestContext,
        name: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            context,
            name: name.into(),
            call_timeout,
        }
    }
}

/// Running once any instance runs; failed once every listed instance crashed.
pub fn app_state(snapshot: &Snapshot) -> AsyncOperationState {
    let instances = app_instances(&snapshot.text());
    if instances.values().any(|state| state == "running") {
        AsyncOperationState::Succeeded
    } else if !instances.is_empty() && instances.values().all(|state| state == "crashed") {
        AsyncOperationState::Failed("all instances crashed".to_string())
    } else {
        AsyncOperationState::InProgress
    }
}

impl ResourceProbe for App {
    type Sampler = CliSampler;
    type Extractor = fn(&Snapshot) -> AsyncOperationState;

    fn sampler(&self) -> CliSampler {
        CliSampler::new(
            self.runner.clone(),
            self.context.clone(),
            args(["app", self.name.as_str()]),
            self.call_timeout,
        )
    }

    fn extractor(&self) -> Self::Extractor {
        app_state
    }

    fn absent(&self) -> Box<dyn Predicate> {
        Box::new(contains("not found"))
    }

    fn describe(&self) -> String {
        format!("app {}", self.name)
    }
}

// =============================================================================
// API-backed probes
// =============================================================================

/// An uploaded package, observed through `GET /v3/packages/{guid}`.
#[derive(Clone)]
pub struct Package {
    client: ApiClient,
    guid: String,
}

impl Package {
    pub fn new(client: ApiClient, guid: impl Into<String>) -> Self {
        Self {
            client,
            guid: guid.into(),
        }
    }
}

fn state_field(snapshot: &Snapshot) -> Option<&str> {
    snapshot.field("/state").and_then(Value::as_str)
}

/// `READY` succeeds; `FAILED` and `EXPIRED` fail.
pub fn package_state(snapshot: &Snapshot) -> AsyncOperationState {
    match state_field(snapshot) {
        Some("READY") => AsyncOperationState::Succeeded,
        Some(state @ ("FAILED" | "EXPIRED")) => {
            AsyncOperationState::Failed(format!("package is {state}"))
        }
        _ => AsyncOperationState::InProgress,
    }
}

impl ResourceProbe for Package {
    type Sampler = ApiSampler;
    type Extractor = fn(&Snapshot) -> AsyncOperationState;

    fn sampler(&self) -> ApiSampler {
        ApiSampler::new(self.client.clone(), format!("/v3/packages/{}", self.guid))
    }

    fn extractor(&self) -> Self::Extractor {
        package_state
    }

    fn absent(&self) -> Box<dyn Predicate> {
        Box::new(status(404))
    }

    fn describe(&self) -> String {
        format!("package {}", self.guid)
    }
}

/// A staged droplet, observed through `GET /v3/droplets/{guid}`.
#[derive(Clone)]
pub struct Droplet {
    client: ApiClient,
    guid: String,
}

impl Droplet {
    pub fn new(client: ApiClient, guid: impl Into<String>) -> Self {
        Self {
            client,
            guid: guid.into(),
        }
    }
}

/// `STAGED` succeeds; `FAILED` and `EXPIRED` fail.
pub fn droplet_state(snapshot: &Snapshot) -> AsyncOperationState {
    match state_field(snapshot) {
        Some("STAGED") => AsyncOperationState::Succeeded,
        Some(state @ ("FAILED" | "EXPIRED")) => {
            let reason = snapshot
                .field("/error")
                .and_then(Value::as_str)
                .map(|error| format!("droplet is {state}: {error}"))
                .unwrap_or_else(|| format!("droplet is {state}"));
            AsyncOperationState::Failed(reason)
        }
        _ => AsyncOperationState::InProgress,
    }
}

impl ResourceProbe for Droplet {
    type Sampler = ApiSampler;
    type Extractor = fn(&Snapshot) -> AsyncOperationState;

    fn sampler(&self) -> ApiSampler {
        ApiSampler::new(self.client.clone(), format!("/v3/droplets/{}", self.guid))
    }

    fn extractor(&self) -> Self::Extractor {
        droplet_state
    }

    fn absent(&self) -> Box<dyn Predicate> {
        Box::new(status(404))
    }

    fn describe(&self) -> String {
        format!("droplet {}", self.guid)
    }
}

// =============================================================================
// Route probe
// =============================================================================

/// An app route, observed by requesting it.
#[derive(Clone)]
pub struct AppRoute {
    probe: HttpProbe,
    host: String,
    path: String,
}

impl AppRoute {
    pub fn new(probe: HttpProbe, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            probe,
            host: host.into(),
            path: path.into(),
        }
    }
}

/// Any 2xx response means the route is serving.
pub fn route_state(snapshot: &Snapshot) -> AsyncOperationState {
    match snapshot.status() {
        Some(code) if (200..300).contains(&code) => AsyncOperationState::Succeeded,
        _ => AsyncOperationState::InProgress,
    }
}

impl ResourceProbe for AppRoute {
    type Sampler = RouteSampler;
    type Extractor = fn(&Snapshot) -> AsyncOperationState;

    fn sampler(&self) -> RouteSampler {
        RouteSampler::new(self.probe.clone(), self.host.clone(), self.path.clone())
    }

    fn extractor(&self) -> Self::Extractor {
        route_state
    }

    fn absent(&self) -> Box<dyn Predicate> {
        Box::new(status(404))
    }

    fn describe(&self) -> String {
        format!("route {}{}", self.probe.route_host(&self.host), self.path)
    }
}

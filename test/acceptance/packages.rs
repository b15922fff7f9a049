//! Packages and droplets.
//!
//! The management API is played by a wiremock server. Uploads and staging
//! are tracked through the resource `state` field.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pat-acceptance --test packages
//! ```

mod common;

use std::sync::Arc;

use pat_converge::{Budget, ConvergeError};
use pat_harness::fake::ScriptedRunner;
use pat_harness::HarnessError;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config, scenario};

const PACKAGE_GUID: &str = "6c4c8f1e-3a5b-4c1d-9e2f-0a1b2c3d4e5f";
const DROPLET_GUID: &str = "8d2e5b7a-1c3f-4e6d-a0b9-c8d7e6f5a4b3";

fn package(state: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "guid": PACKAGE_GUID,
        "type": "bits",
        "state": state,
    }))
}

async fn api() -> MockServer {
    MockServer::start().await
}

#[tokio::test]
async fn test_upload_and_stage() {
    let server = api().await;
    let package_path = format!("/v3/packages/{PACKAGE_GUID}");
    let droplet_path = format!("/v3/droplets/{DROPLET_GUID}");

    Mock::given(method("POST"))
        .and(path("/v3/packages"))
        .respond_with(package("AWAITING_UPLOAD"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(package_path.as_str()))
        .respond_with(package("PROCESSING_UPLOAD"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(package_path.as_str()))
        .respond_with(package("READY"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(droplet_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": DROPLET_GUID,
            "state": "STAGING",
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(droplet_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": DROPLET_GUID,
            "state": "STAGED",
            "process_types": {"web": "bundle exec rackup"},
        })))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    let mut config = config();
    config.api_url = server.uri();

    scenario("upload and stage", &runner, config)
        .run(|s| async move {
            let created: Value = s
                .api()
                .post("/v3/packages", &json!({"type": "bits"}))
                .await?;
            let guid = created["guid"].as_str().expect("package guid").to_string();

            let ready = s.await_ready(&s.package(guid), Budget::Push).await?;
            assert_eq!(ready.field("/state"), Some(&json!("READY")));
            assert_eq!(ready.sequence(), 3);

            let staged = s.await_ready(&s.droplet(DROPLET_GUID), Budget::Push).await?;
            assert_eq!(
                staged.field("/process_types/web"),
                Some(&json!("bundle exec rackup"))
            );
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_staging_stops_the_wait() {
    let server = api().await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/droplets/{DROPLET_GUID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": DROPLET_GUID,
            "state": "FAILED",
            "error": "StagingError - Staging error: buildpack compile failed",
        })))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    let mut config = config();
    config.api_url = server.uri();
    let s = scenario("failed staging", &runner, config);

    let err = s
        .await_ready(&s.droplet(DROPLET_GUID), Budget::Push)
        .await
        .unwrap_err();

    match err {
        HarnessError::Converge(ConvergeError::TerminalFailure { reason, samples, .. }) => {
            assert_eq!(
                reason,
                "droplet is FAILED: StagingError - Staging error: buildpack compile failed"
            );
            assert_eq!(samples, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_deleted_package_goes_away() {
    let server = api().await;
    let package_path = format!("/v3/packages/{PACKAGE_GUID}");

    Mock::given(method("DELETE"))
        .and(path(package_path.as_str()))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(package_path.as_str()))
        .respond_with(package("READY"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(package_path.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"code": 10010, "title": "CF-ResourceNotFound", "detail": "Package not found"}]
        })))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    let mut config = config();
    config.api_url = server.uri();
    let s = scenario("delete package", &runner, config);

    s.api().delete(&package_path).await.unwrap();
    let gone = s
        .await_gone(&s.package(PACKAGE_GUID), Budget::Short)
        .await
        .unwrap();
    assert_eq!(gone.status(), Some(404));
    assert_eq!(
        gone.field("/errors/0/detail"),
        Some(&json!("Package not found"))
    );
}

#[tokio::test]
async fn test_api_errors_surface_with_detail() {
    let server = api().await;
    Mock::given(method("POST"))
        .and(path("/v3/packages"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{"code": 10008, "title": "CF-UnprocessableEntity", "detail": "Type must be one of 'bits', 'docker'"}]
        })))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    let mut config = config();
    config.api_url = server.uri();
    let s = scenario("bad package", &runner, config);

    let err = s
        .api()
        .post::<Value, _>("/v3/packages", &json!({"type": "zip"}))
        .await
        .unwrap_err();
    match err {
        HarnessError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Type must be one of 'bits', 'docker'");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

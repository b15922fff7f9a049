//! Routing.
//!
//! The router is played by a wiremock server; route probes connect to it and
//! name the route in the `Host` header.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pat-acceptance --test routing
//! ```

mod common;

use std::sync::Arc;

use pat_converge::predicate::contains;
use pat_converge::Budget;
use pat_harness::fake::ScriptedRunner;
use pat_harness::parse::{instance_index, vcap_id, VCAP_ID};
use pat_harness::samplers::RouteSampler;
use pat_names::RouteHost;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config, scenario};

fn not_found(host: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_string(format!(
        "404 Not Found: Requested route ('{host}') does not exist."
    ))
}

async fn router() -> MockServer {
    MockServer::start().await
}

#[tokio::test]
async fn test_mapped_route_becomes_reachable() {
    let host = RouteHost::random().to_string();
    let fqdn = format!("{host}.bosh-lite.com");
    let server = router().await;

    Mock::given(method("GET"))
        .and(header("host", fqdn.as_str()))
        .respond_with(not_found(&fqdn))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("host", fqdn.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hi, I'm Dora!"))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(["map-route"], "OK").ok(["unmap-route"], "OK");

    let mut config = config();
    config.router_url = Some(server.uri());

    let route_host = host.clone();
    scenario("map route", &runner, config)
        .run(|s| async move {
            s.run_ok(["map-route", "web", "bosh-lite.com", "--hostname", route_host.as_str()])
                .await?;
            s.defer(["unmap-route", "web", "bosh-lite.com", "--hostname", route_host.as_str()]);

            let snapshot = s
                .await_ready(&s.route(route_host.as_str(), "/"), Budget::Curl)
                .await?;
            assert_eq!(snapshot.status(), Some(200));
            assert_eq!(snapshot.sequence(), 3);
            assert_eq!(snapshot.text(), "Hi, I'm Dora!");
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(runner.count(&["unmap-route"]), 1);
}

#[tokio::test]
async fn test_unmapped_route_goes_away() {
    let host = RouteHost::random().to_string();
    let fqdn = format!("{host}.bosh-lite.com");
    let server = router().await;

    Mock::given(method("GET"))
        .and(header("host", fqdn.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("host", fqdn.as_str()))
        .respond_with(not_found(&fqdn))
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(["unmap-route"], "OK");
    let mut config = config();
    config.router_url = Some(server.uri());
    let s = scenario("unmap route", &runner, config);

    s.run_ok(["unmap-route", "web", "bosh-lite.com", "--hostname", host.as_str()])
        .await
        .unwrap();
    let snapshot = s
        .await_gone(&s.route(host.as_str(), "/"), Budget::Curl)
        .await
        .unwrap();
    assert_eq!(snapshot.status(), Some(404));
    assert!(snapshot.text().contains("does not exist"));
}

#[tokio::test]
async fn test_session_affinity_pins_one_instance() {
    let host = RouteHost::random().to_string();
    let fqdn = format!("{host}.bosh-lite.com");
    let server = router().await;
    let cookie = format!("{VCAP_ID}=f00d");

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("host", fqdn.as_str()))
        .and(header("cookie", cookie.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello, web at index: 1!"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("host", fqdn.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{VCAP_ID}=f00d; Path=/; HttpOnly").as_str())
                .set_body_string("Hello, web at index: 0!"),
        )
        .mount(&server)
        .await;

    let runner = Arc::new(ScriptedRunner::new());
    let mut config = config();
    config.router_url = Some(server.uri());
    let s = scenario("session affinity", &runner, config);

    let first = s.probe().get(&host, "/", None).await.unwrap();
    let id = first
        .header("set-cookie")
        .and_then(vcap_id)
        .expect("affinity cookie");
    assert_eq!(id, "f00d");

    let sticky = RouteSampler::new(s.probe().clone(), host.as_str(), "/")
        .with_cookie(format!("{VCAP_ID}={id}"));
    let snapshot = s
        .wait_for(&sticky, &contains("at index: 1!"), Budget::Curl)
        .await
        .unwrap();
    assert_eq!(instance_index(&snapshot.text()), Some(1));

    for _ in 0..3 {
        let again = s.probe().get(&host, "/", Some(&cookie)).await.unwrap();
        let pat_converge::ResponseBody::Text(body) = again.body else {
            panic!("expected a text body");
        };
        assert_eq!(instance_index(&body), Some(1));
    }
}

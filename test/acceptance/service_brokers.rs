//! Service broker lifecycle and plan access.
//!
//! Broker registration and access control run as the admin user; the
//! marketplace is checked as the regular user.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pat-acceptance --test service_brokers
//! ```

mod common;

use std::sync::Arc;

use pat_converge::predicate::{contains, PredicateExt};
use pat_converge::Budget;
use pat_harness::fake::ScriptedRunner;
use pat_harness::parse::{service_access, Access};
use pat_names::{BrokerName, OrgName, ServiceName};

use common::{config, scenario};

fn access_listing(service: &str, access: &str, orgs: &str) -> String {
    format!(
        "getting service access as admin...\n\
         broker: fake-broker\n   \
         service   plan    access   orgs\n   \
         {service}   small   {access}   {orgs}\n   \
         {service}   large   none\n"
    )
}

#[tokio::test]
async fn test_register_broker_and_enable_access() {
    let broker = BrokerName::random().to_string();
    let service = ServiceName::random().to_string();
    let org = OrgName::random().to_string();

    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["create-service-broker"], "OK")
        .ok(["delete-service-broker"], "OK")
        .ok(["enable-service-access"], "OK")
        .ok(["service-access"], &access_listing(&service, "none", ""))
        .ok(["marketplace"], "No service offerings found");

    let (broker_name, service_name, org_name) = (broker.clone(), service.clone(), org.clone());
    let fake = runner.clone();
    scenario("broker lifecycle", &runner, config())
        .with_org(org.as_str())
        .run(|s| async move {
            let admin = s.as_admin();
            admin
                .run_ok([
                    "create-service-broker",
                    broker_name.as_str(),
                    "user",
                    "password",
                    "http://fake-broker.bosh-lite.com",
                ])
                .await?;
            admin.defer(["delete-service-broker", broker_name.as_str(), "-f"]);

            let rows = service_access(&admin.run_ok(["service-access"]).await?.stdout);
            assert_eq!(rows.len(), 2);
            assert!(rows.iter().all(|row| row.access == Access::None));

            admin
                .run_ok([
                    "enable-service-access",
                    service_name.as_str(),
                    "-p",
                    "small",
                    "-o",
                    org_name.as_str(),
                ])
                .await?;
            fake.ok(
                ["service-access"],
                &access_listing(&service_name, "limited", &org_name),
            );
            let rows = service_access(&admin.run_ok(["service-access"]).await?.stdout);
            let small = rows.iter().find(|row| row.plan == "small").expect("small plan");
            assert_eq!(small.access, Access::Limited);
            assert_eq!(small.orgs, vec![org_name.clone()]);

            fake.sequence(
                ["marketplace"],
                &[
                    "No service offerings found",
                    format!("service   plans   description\n{service_name}   small   fake service")
                        .as_str(),
                ],
            );
            let visible = contains(service_name.as_str()).and(contains("small"));
            let user = s.as_regular();
            user.wait_for(&user.sampler(["marketplace"]), &visible, Budget::Short)
                .await?;
            Ok(())
        })
        .await
        .unwrap();

    let calls = runner.calls();
    let user_of = |command: &str| {
        calls
            .iter()
            .filter(|call| call.args.first().map(String::as_str) == Some(command))
            .map(|call| call.user.clone())
            .collect::<Vec<_>>()
    };
    assert!(user_of("create-service-broker").iter().all(|user| user == "admin"));
    assert!(user_of("enable-service-access").iter().all(|user| user == "admin"));
    assert!(user_of("marketplace").iter().all(|user| user == "pat-user"));
    assert_eq!(user_of("delete-service-broker"), vec!["admin".to_string()]);
}

#[tokio::test]
async fn test_marketplace_never_lists_disabled_service() {
    let service = ServiceName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(["marketplace"], "No service offerings found");

    let s = scenario("disabled service", &runner, config());
    let err = s
        .wait_for(&s.sampler(["marketplace"]), &contains(service.as_str()), Budget::Short)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("No service offerings found"));
}

//! Service instance lifecycle.
//!
//! Covers synchronous and asynchronous provisioning, plan updates, binding
//! and deprovisioning, including the failure paths a broker can report.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pat-acceptance --test service_instances
//! ```

mod common;

use std::sync::Arc;

use pat_converge::predicate::{contains, excludes, PredicateExt};
use pat_converge::{
    AsyncOperationState, Budget, CommandOutput, ConvergeError, OperationKind, OperationStatus,
};
use pat_harness::fake::ScriptedRunner;
use pat_harness::parse::ServiceInstanceDetails;
use pat_harness::resources::await_gone_or_failed;
use pat_harness::HarnessError;
use pat_names::{AppName, ServiceInstanceName};

use common::{config, failed, scenario};

fn details(name: &str, plan: &str, status: &str, message: &str) -> String {
    format!(
        "Service instance: {name}\nService: fake-service\nPlan: {plan}\nStatus: {status}\nMessage: {message}\n"
    )
}

#[tokio::test]
async fn test_synchronous_create_converges_on_first_sample() {
    let instance = ServiceInstanceName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["create-service"], "OK")
        .ok(["delete-service"], "OK")
        .ok(
            ["service", instance.as_str()],
            details(&instance, "small", "create succeeded", "").as_str(),
        );

    let name = instance.clone();
    scenario("sync create", &runner, config())
        .run(|s| async move {
            s.run_ok(["create-service", "fake-service", "small", name.as_str()])
                .await?;
            s.defer(["delete-service", name.as_str(), "-f"]);
            s.await_ready(&s.service_instance(name.as_str()), Budget::AsyncOperation)
                .await?;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(runner.count(&["service", instance.as_str()]), 1);
    assert_eq!(runner.count(&["delete-service", instance.as_str()]), 1);
}

#[tokio::test]
async fn test_async_create_update_bind_and_delete() {
    let instance = ServiceInstanceName::random().to_string();
    let app = AppName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["create-service"], "Create in progress. Use 'service' to check operation status.")
        .ok(["update-service"], "Update in progress.")
        .ok(["bind-service"], "OK")
        .ok(["unbind-service"], "OK")
        .ok(["delete-service"], "Delete in progress.")
        .sequence(
            ["service", instance.as_str()],
            &[
                details(&instance, "small", "create in progress", "10 percent done").as_str(),
                details(&instance, "small", "create in progress", "60 percent done").as_str(),
                details(&instance, "small", "create succeeded", "").as_str(),
            ],
        )
        .ok(["services"], "name   service   plan   bound apps\n");

    let name = instance.clone();
    let app_name = app.clone();
    let fake = runner.clone();
    scenario("async lifecycle", &runner, config())
        .run(|s| async move {
            s.run_ok(["create-service", "fake-service", "small", name.as_str()])
                .await?;
            let probe = s.service_instance(name.as_str());

            let created = s.await_ready(&probe, Budget::AsyncOperation).await?;
            let status = OperationStatus::from_snapshot(&created).expect("status line");
            assert_eq!(status.kind, Some(OperationKind::Create));
            assert_eq!(status.state, AsyncOperationState::Succeeded);

            s.run_ok(["update-service", name.as_str(), "-p", "large"]).await?;
            fake.sequence(
                ["service", name.as_str()],
                &[
                    details(&name, "small", "update in progress", "").as_str(),
                    details(&name, "large", "update succeeded", "").as_str(),
                ],
            );
            let updated = s.await_ready(&probe, Budget::AsyncOperation).await?;
            let parsed = ServiceInstanceDetails::parse(&updated.text());
            assert_eq!(parsed.plan.as_deref(), Some("large"));

            s.run_ok(["bind-service", app_name.as_str(), name.as_str()]).await?;
            fake.ok(
                ["services"],
                &format!("name   service   plan   bound apps\n{name}   fake-service   large   {app_name}\n"),
            );
            s.wait_for(&s.sampler(["services"]), &contains(app_name.as_str()), Budget::Short)
                .await?;

            s.run_ok(["unbind-service", app_name.as_str(), name.as_str()]).await?;
            fake.ok(
                ["services"],
                &format!("name   service   plan   bound apps\n{name}   fake-service   large\n"),
            );
            s.wait_for(
                &s.sampler(["services"]),
                &contains(name.as_str()).and(excludes(app_name.as_str())),
                Budget::Short,
            )
            .await?;

            s.run_ok(["delete-service", name.as_str(), "-f"]).await?;
            fake.on(
                ["service", name.as_str()],
                vec![
                    CommandOutput::new(
                        0,
                        details(&name, "large", "delete in progress", ""),
                        "",
                    ),
                    failed(&format!("Service instance {name} not found")),
                ],
            );
            s.await_gone(&probe, Budget::AsyncOperation).await?;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(runner.count(&["delete-service", instance.as_str()]), 1);
    assert!(runner.count(&["service", instance.as_str()]) >= 7);
}

#[tokio::test]
async fn test_failed_create_reports_broker_message() {
    let instance = ServiceInstanceName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner.sequence(
        ["service", instance.as_str()],
        &[
            details(&instance, "small", "create in progress", "").as_str(),
            details(&instance, "small", "create failed", "Service broker error: quota exceeded").as_str(),
        ],
    );

    let s = scenario("failed create", &runner, config());
    let err = s
        .await_ready(&s.service_instance(instance.as_str()), Budget::AsyncOperation)
        .await
        .unwrap_err();

    match err {
        HarnessError::Converge(ConvergeError::TerminalFailure { reason, samples, .. }) => {
            assert_eq!(reason, "Service broker error: quota exceeded");
            assert_eq!(samples, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_delete_is_ignored_unless_requested() {
    let instance = ServiceInstanceName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(
        ["service", instance.as_str()],
        details(&instance, "small", "delete failed", "instance has bindings").as_str(),
    );

    let s = scenario("failed delete", &runner, config());
    let probe = s.service_instance(instance.as_str());

    // Plain absence waits keep polling through a failed delete.
    let err = s.await_gone(&probe, Budget::AsyncOperation).await.unwrap_err();
    assert!(err.is_timeout());

    let outcome = await_gone_or_failed(&probe, s.policy(Budget::AsyncOperation)).await;
    assert!(outcome.is_terminal_failure());
    let err = s.expect(outcome, "service instance gone").unwrap_err();
    assert!(err.to_string().contains("instance has bindings"));
}

//! Application lifecycle.
//!
//! Push, scale and delete an app, waiting on each asynchronous transition:
//!
//! 1. Push and wait for the first instance to run
//! 2. Scale to two instances and wait for both
//! 3. Check audit events
//! 4. Delete and wait for the app to disappear
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pat-acceptance --test app_lifecycle
//! ```

mod common;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use pat_converge::predicate::from_fn;
use pat_converge::{Budget, ConvergeError, Verdict};
use pat_harness::fake::ScriptedRunner;
use pat_harness::parse::{app_instances, instances_in_state};
use pat_harness::HarnessError;
use pat_names::AppName;

use common::{config, failed, scenario};

const STARTING: &str = "\
     state      since                    cpu    memory
#0   starting   2026-10-17 10:00:00 AM   0.0%   0 of 256M";

const ONE_RUNNING: &str = "\
     state      since                    cpu    memory
#0   running    2026-10-17 10:00:05 AM   0.1%   20M of 256M";

const SCALING: &str = "\
     state      since                    cpu    memory
#0   running    2026-10-17 10:00:05 AM   0.1%   20M of 256M
#1   starting   2026-10-17 10:01:00 AM   0.0%   0 of 256M";

const TWO_RUNNING: &str = "\
     state      since                    cpu    memory
#0   running    2026-10-17 10:00:05 AM   0.1%   20M of 256M
#1   running    2026-10-17 10:01:04 AM   0.1%   20M of 256M";

#[tokio::test]
async fn test_push_scale_and_delete() {
    let app = AppName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["push", app.as_str()], "OK")
        .ok(["scale", app.as_str()], "OK")
        .ok(["delete", app.as_str()], "OK")
        .sequence(["app", app.as_str()], &[STARTING, STARTING, ONE_RUNNING])
        .ok(
            ["events", app.as_str()],
            "audit.app.create\naudit.app.update\naudit.app.delete-request",
        );

    let name = app.clone();
    let fake = runner.clone();
    scenario("app lifecycle", &runner, config())
        .run(|s| async move {
            s.run_ok_within(Budget::Push, ["push", name.as_str()]).await?;
            s.defer(["delete", name.as_str(), "-f"]);

            let snapshot = s.await_ready(&s.app(name.as_str()), Budget::Push).await?;
            assert_eq!(app_instances(&snapshot.text()).len(), 1);

            s.run_ok(["scale", name.as_str(), "-i", "2"]).await?;
            fake.sequence(["app", name.as_str()], &[SCALING, TWO_RUNNING]);

            let both_running = from_fn("2 instances running", |snapshot| {
                Verdict::from_bool(instances_in_state(&snapshot.text(), "running") == 2)
            });
            s.wait_for(&s.sampler(["app", name.as_str()]), &both_running, Budget::Push)
                .await?;

            s.check_events(name.as_str(), &["audit.app.create", "audit.app.update"])
                .await?;

            s.run_ok(["delete", name.as_str(), "-f"]).await?;
            fake.on(
                ["app", name.as_str()],
                vec![failed(&format!("App {name} not found"))],
            );
            s.await_gone(&s.app(name.as_str()), Budget::Short).await?;
            Ok(())
        })
        .await
        .unwrap();

    // Explicit delete plus the deferred one.
    assert_eq!(runner.count(&["delete", app.as_str(), "-f"]), 2);
    assert!(runner.count(&["app", app.as_str()]) >= 6);
}

#[tokio::test]
async fn test_crashing_app_fails_without_waiting() {
    let app = AppName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["push", app.as_str()], "OK")
        .ok(["delete", app.as_str()], "OK")
        .ok(
            ["app", app.as_str()],
            "#0   crashed   2026-10-17 10:00:05 AM   0.0%   0 of 256M",
        );

    let name = app.clone();
    let err = scenario("crashing app", &runner, config())
        .run(|s| async move {
            s.run_ok(["push", name.as_str()]).await?;
            s.defer(["delete", name.as_str(), "-f"]);
            s.await_ready(&s.app(name.as_str()), Budget::Push).await?;
            Ok(())
        })
        .await
        .unwrap_err();

    match err {
        HarnessError::Converge(ConvergeError::TerminalFailure { reason, samples, .. }) => {
            assert_eq!(reason, "all instances crashed");
            assert_eq!(samples, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(runner.count(&["app", app.as_str()]), 1);
    assert_eq!(runner.count(&["delete", app.as_str()]), 1);
}

#[tokio::test]
async fn test_app_that_never_starts_times_out() {
    let app = AppName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(["app", app.as_str()], STARTING);

    let s = scenario("slow app", &runner, config());
    let err = s
        .await_ready(&s.app(app.as_str()), Budget::Push)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    let message = err.to_string();
    assert!(message.contains(&format!("app {app} ready")));
    assert!(message.contains("starting"));
}

#[tokio::test]
async fn test_cleanup_runs_when_an_assertion_fails() {
    let app = AppName::random().to_string();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .ok(["push", app.as_str()], "OK")
        .ok(["delete", app.as_str()], "OK")
        .ok(["app", app.as_str()], ONE_RUNNING);

    let name = app.clone();
    let run = scenario("failing assertion", &runner, config()).run(|s| async move {
        s.run_ok(["push", name.as_str()]).await?;
        s.defer(["delete", name.as_str(), "-f"]);
        let snapshot = s.await_ready(&s.app(name.as_str()), Budget::Push).await?;
        assert_eq!(app_instances(&snapshot.text()).len(), 3, "expected three instances");
        Ok(())
    });

    let result = AssertUnwindSafe(run).catch_unwind().await;

    assert!(result.is_err());
    assert_eq!(runner.count(&["delete", app.as_str(), "-f"]), 1);
}

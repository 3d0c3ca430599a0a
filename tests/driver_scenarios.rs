//! End-to-end scenarios through the `Platform` facade, on paused tokio time.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use alauda_pipeline::client::StartBuildRequest;
use alauda_pipeline::error::RollbackReport;
use alauda_pipeline::steps::StepRequest;
use alauda_pipeline::{ClientError, ConfigError, DriverError, MonitorError, Outcome, RunOptions};

use helpers::{app_with, platform, service, status, ScriptedClient};

fn build_request() -> StartBuildRequest {
    StartBuildRequest {
        build_config_name: "api".into(),
        ..Default::default()
    }
}

fn component_payload() -> serde_json::Value {
    serde_json::json!({
        "kind": "Deployment",
        "metadata": {
            "name": "web",
            "labels": { "service.alauda.io/uuid": "c-42" }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_failed_service_update_rolls_back() {
    let client = Arc::new(ScriptedClient::default());
    client.services.push(Ok(service("Deploying", false, false)));
    client.services.push(Ok(service("Deploying", false, false)));
    client.services.push(Ok(service("Error", true, false)));
    client.services.push(Ok(service("Running", true, true)));
    let (platform, sink) = platform(client.clone());

    let options = platform.deploy_options(false, true, Some(600));
    let err = platform
        .update_service("svc-1", serde_json::json!({ "image_tag": "2.0" }), &options)
        .await
        .unwrap_err();

    match &err {
        DriverError::Failed { rollback, link, .. } => {
            assert_eq!(
                *rollback,
                RollbackReport::RolledBack { link: link.clone() }
            );
        }
        other => panic!("Expected Failed with rollback, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("https://x.example.com/console/k8s_service/detail/svc-1"));
    assert!(message.contains("already rolled back"));

    assert_eq!(client.count("update_service"), 1);
    assert_eq!(client.count("rollback_service"), 1);
    assert_eq!(client.count("retrieve_service"), 4);
    assert!(sink.contains("will try to rollback"));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_component_rollback() {
    let client = Arc::new(ScriptedClient::rejecting_rollback());
    client
        .apps
        .push(Ok(app_with("deployment-web", status("Error", true, false))));
    let (platform, _sink) = platform(client.clone());

    let component = platform.component_ref("shop", "Deployment", "web", None, None);
    let options = platform.deploy_options(false, true, None);
    let err = platform
        .update_component(component, component_payload(), &options)
        .await
        .unwrap_err();

    match &err {
        DriverError::RollbackFailed { link, cause, .. } => {
            assert_eq!(link, "https://x.example.com/console/k8s_app/detail/component/c-42");
            assert!(cause.contains("not accepted"));
        }
        other => panic!("Expected RollbackFailed, got {:?}", other),
    }
    assert_eq!(client.count("rollback_component"), 1);
    assert_eq!(client.count("retrieve_application_status"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_blank_component_name_rejected_before_update() {
    let client = Arc::new(ScriptedClient::default());
    let (platform, sink) = platform(client.clone());

    let component = platform.component_ref("shop", "Deployment", "", None, None);
    let err = platform
        .update_component(component, component_payload(), &platform.deploy_options(false, false, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DriverError::Config(ConfigError::MissingArgument {
            field: "component_name"
        })
    ));
    assert!(client.calls().is_empty());
    assert!(sink.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_component_waits_for_workload_to_appear() {
    let client = Arc::new(ScriptedClient::default());
    client.apps.push(Ok(Default::default()));
    client
        .apps
        .push(Ok(app_with("deployment-web", status("Deploying", false, false))));
    client
        .apps
        .push(Ok(app_with("deployment-web", status("Running", true, true))));
    let (platform, sink) = platform(client.clone());

    let component = platform.component_ref("shop", "Deployment", "web", None, Some("apps"));
    assert_eq!(component.namespace, "apps");
    assert_eq!(component.cluster_name, "prod");

    let start = tokio::time::Instant::now();
    let result = platform
        .update_component(component, component_payload(), &platform.deploy_options(false, false, None))
        .await
        .unwrap();

    assert_eq!(result.id, "web");
    assert!(matches!(result.outcome, Some(Outcome::Succeeded { polls: 3, .. })));
    // 2s warm-up plus two 5s intervals
    assert!(start.elapsed() >= Duration::from_secs(12));
    assert!(sink.contains("can not be found, will try again"));
}

#[tokio::test(start_paused = true)]
async fn test_build_timeout_reports_link_and_last_status() {
    let client = Arc::new(ScriptedClient::default());
    client.builds.push(Ok(serde_json::json!({ "status": "B" })));
    let mut config = helpers::config();
    config.polling.build_timeout_secs = 60;
    let sink = Arc::new(helpers::RecordingSink::default());
    let platform = alauda_pipeline::Platform::new(
        config,
        client.clone(),
        Arc::new(alauda_pipeline::TokioClock),
        sink.clone(),
    )
    .unwrap();

    let err = platform
        .start_build(build_request(), false, false)
        .await
        .unwrap_err();

    match &err {
        DriverError::TimedOut {
            elapsed,
            last_status,
            link,
            ..
        } => {
            assert!(*elapsed >= Duration::from_secs(60));
            assert_eq!(last_status.as_deref(), Some("B"));
            assert_eq!(link, "https://x.example.com/console/build/history/detail/build-1");
        }
        other => panic!("Expected TimedOut, got {:?}", other),
    }
    assert!(sink.contains("Build:[dev/api] Starting"));
    assert!(sink.contains("Timeout, more than 60 seconds!"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_service_response_ends_run() {
    let client = Arc::new(ScriptedClient::default());
    client
        .services
        .push(Err(ClientError::Malformed("missing field `resource`".into())));
    let (platform, _sink) = platform(client.clone());

    let options = platform.deploy_options(false, true, None);
    let err = platform
        .update_service("svc-1", serde_json::json!({}), &options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DriverError::Errored {
            cause: MonitorError::Malformed(_),
            ..
        }
    ));
    assert_eq!(client.count("retrieve_service"), 1);
    assert_eq!(client.count("rollback_service"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_with_ignored_result() {
    let client = Arc::new(ScriptedClient::default());
    client.builds.push(Ok(serde_json::json!({ "status": "F" })));
    let (platform, _sink) = platform(client.clone());

    let result = platform
        .start_build(build_request(), false, true)
        .await
        .unwrap();

    assert_eq!(result.id, "build-1");
    assert!(matches!(result.outcome, Some(Outcome::Failed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_async_create_does_not_poll() {
    let client = Arc::new(ScriptedClient::default());
    let (platform, _sink) = platform(client.clone());

    let options = platform.deploy_options(true, false, None);
    let result = platform
        .create_service(serde_json::json!({ "service_name": "web" }), None, &options)
        .await
        .unwrap();

    assert_eq!(result.id, "svc-new");
    assert!(result.outcome.is_none());
    assert_eq!(client.calls(), vec!["create_service"]);
}

#[tokio::test(start_paused = true)]
async fn test_create_service_has_no_rollback() {
    let client = Arc::new(ScriptedClient::default());
    client.services.push(Ok(service("Error", true, false)));
    let (platform, _sink) = platform(client.clone());

    let options = platform.deploy_options(false, true, None);
    let err = platform
        .create_service(serde_json::json!({ "service_name": "web" }), None, &options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DriverError::Failed {
            rollback: RollbackReport::Unavailable,
            ..
        }
    ));
    assert_eq!(client.count("rollback_service"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_stops_waiting() {
    let client = Arc::new(ScriptedClient::default());
    client.services.push(Ok(service("Deploying", false, false)));
    let (platform, _sink) = platform(client.clone());
    let (tx, rx) = watch::channel(false);
    let platform = platform.with_interrupt(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(25)).await;
        let _ = tx.send(true);
    });

    let err = platform
        .update_service("svc-1", serde_json::json!({}), &RunOptions::wait(Duration::from_secs(600)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DriverError::Errored {
            cause: MonitorError::Interrupted,
            ..
        }
    ));
    assert_eq!(client.count("retrieve_service"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_deploy_service_step_end_to_end() {
    let client = Arc::new(ScriptedClient::default());
    client.services.push(Ok(service("Deploying", false, false)));
    client.services.push(Ok(service("Running", true, true)));
    let (platform, _sink) = platform(client.clone());

    let step = StepRequest::parse(
        r#"
step: deploy_service
service_id: svc-1
timeout: 120
payload:
  image_tag: "2.0"
"#,
    )
    .unwrap();
    let output = step.execute(&platform).await.unwrap();

    assert_eq!(output["id"], "svc-1");
    assert_eq!(output["kind"], "service");
    assert_eq!(output["outcome"], "SUCCEED");
    assert_eq!(output["status"], "Running");
    assert_eq!(
        output["detail_link"],
        "https://x.example.com/console/k8s_service/detail/svc-1"
    );
}

#[tokio::test(start_paused = true)]
async fn test_retrieve_steps_bypass_driver() {
    let client = Arc::new(ScriptedClient::default());
    client.services.push(Ok(service("Running", true, true)));
    client
        .component
        .push(Ok(serde_json::json!({ "resource": { "name": "web" } })));
    let (platform, sink) = platform(client.clone());

    let by_name = StepRequest::parse("step: retrieve_service\nservice_name: web\n").unwrap();
    let output = by_name.execute(&platform).await.unwrap();
    assert_eq!(output["unique_name"], "svc-1");
    assert_eq!(output["resource"]["status"], "Running");

    let component = StepRequest::parse(
        "step: retrieve_component\napplication_name: shop\nresource_type: Deployment\ncomponent_name: web\n",
    )
    .unwrap();
    let output = component.execute(&platform).await.unwrap();
    assert_eq!(output["resource"]["name"], "web");

    let delete = StepRequest::parse("step: delete_build\nbuild_id: build-9\n").unwrap();
    let output = delete.execute(&platform).await.unwrap();
    assert_eq!(output["deleted"], true);

    platform
        .delete_service("web", None, Some("apps"), None)
        .await
        .unwrap();
    client.builds.push(Ok(serde_json::json!({ "build_id": "build-9", "status": "S" })));
    let build = platform.retrieve_build("build-9").await.unwrap();
    assert_eq!(build["status"], "S");

    assert_eq!(
        client.calls(),
        vec![
            "retrieve_service_by_name",
            "retrieve_component",
            "delete_build",
            "delete_service",
            "retrieve_build"
        ]
    );
    assert!(sink.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retrieve_integration_step() {
    let client = Arc::new(ScriptedClient::default());
    client
        .integrations
        .push(Ok(Some(serde_json::json!({ "uuid": "i-1", "type": "SonarQube" }))));
    client.integrations.push(Ok(None));
    let (platform, sink) = platform(client.clone());

    let step = StepRequest::parse("step: retrieve_integration\ninstance_uuid: i-1\n").unwrap();
    let output = step.execute(&platform).await.unwrap();
    assert_eq!(output["type"], "SonarQube");

    let err = platform.retrieve_integration("i-2", Some("shop")).await.unwrap_err();
    assert_eq!(err, ClientError::NotFound("Integration".into()));
    assert_eq!(err.to_string(), "Integration is not found.");

    assert_eq!(client.count("retrieve_integration"), 2);
    assert!(sink.lines().is_empty());
}

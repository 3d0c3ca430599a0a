//! Shared fixtures for scenario tests: a scripted platform client and a
//! recording console.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use alauda_pipeline::client::{
    ApplicationStatus, ComponentRef, PlatformClient, ResourceStatus, ServiceDetails, ServiceRef,
    StartBuildRequest,
};
use alauda_pipeline::{ClientError, LogSink, Platform, PlatformConfig, TokioClock};

/// Replays responses in order, then repeats the last one.
pub struct Script<T: Clone> {
    queue: Mutex<VecDeque<Result<T, ClientError>>>,
    last: Mutex<Option<Result<T, ClientError>>>,
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
        }
    }
}

impl<T: Clone> Script<T> {
    pub fn push(&self, response: Result<T, ClientError>) {
        self.queue.lock().unwrap().push_back(response);
    }

    fn next(&self) -> Result<T, ClientError> {
        if let Some(response) = self.queue.lock().unwrap().pop_front() {
            *self.last.lock().unwrap() = Some(response.clone());
            return response;
        }
        self.last
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Transport("not scripted".into())))
    }
}

/// In-memory platform that records every call by name.
#[derive(Default)]
pub struct ScriptedClient {
    pub builds: Script<serde_json::Value>,
    pub services: Script<ServiceDetails>,
    pub apps: Script<ApplicationStatus>,
    pub component: Script<serde_json::Value>,
    pub integrations: Script<Option<serde_json::Value>>,
    pub reject_rollback: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Client whose rollback calls are refused by the platform.
    pub fn rejecting_rollback() -> Self {
        Self {
            reject_rollback: true,
            ..Default::default()
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn rollback_result(&self) -> Result<(), ClientError> {
        if self.reject_rollback {
            Err(ClientError::UnexpectedStatus {
                status: 409,
                body: "no previous revision".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    async fn start_build(&self, _request: &StartBuildRequest) -> Result<String, ClientError> {
        self.record("start_build");
        Ok("build-1".into())
    }

    async fn retrieve_build(&self, _build_id: &str) -> Result<serde_json::Value, ClientError> {
        self.record("retrieve_build");
        self.builds.next()
    }

    async fn delete_build(&self, _build_id: &str) -> Result<(), ClientError> {
        self.record("delete_build");
        Ok(())
    }

    async fn create_service(
        &self,
        _payload: &serde_json::Value,
        _project_name: &str,
    ) -> Result<String, ClientError> {
        self.record("create_service");
        Ok("svc-new".into())
    }

    async fn update_service(
        &self,
        service_id: &str,
        _payload: &serde_json::Value,
    ) -> Result<String, ClientError> {
        self.record("update_service");
        Ok(service_id.to_string())
    }

    async fn retrieve_service(&self, _service_id: &str) -> Result<ServiceDetails, ClientError> {
        self.record("retrieve_service");
        self.services.next()
    }

    async fn retrieve_service_by_name(
        &self,
        _service: &ServiceRef,
    ) -> Result<ServiceDetails, ClientError> {
        self.record("retrieve_service_by_name");
        self.services.next()
    }

    async fn delete_service(&self, _service: &ServiceRef) -> Result<(), ClientError> {
        self.record("delete_service");
        Ok(())
    }

    async fn rollback_service(&self, _service_id: &str) -> Result<(), ClientError> {
        self.record("rollback_service");
        self.rollback_result()
    }

    async fn update_component(
        &self,
        _component: &ComponentRef,
        _payload: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.record("update_component");
        Ok(())
    }

    async fn retrieve_component(
        &self,
        _component: &ComponentRef,
        _project_name: &str,
    ) -> Result<serde_json::Value, ClientError> {
        self.record("retrieve_component");
        self.component.next()
    }

    async fn retrieve_application_status(
        &self,
        _cluster_name: &str,
        _namespace: &str,
        _application_name: &str,
    ) -> Result<ApplicationStatus, ClientError> {
        self.record("retrieve_application_status");
        self.apps.next()
    }

    async fn rollback_component(&self, _component: &ComponentRef) -> Result<(), ClientError> {
        self.record("rollback_component");
        self.rollback_result()
    }

    async fn retrieve_integration(
        &self,
        _instance_uuid: &str,
        _project_name: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.record("retrieve_integration");
        self.integrations.next()
    }
}

/// Console sink that keeps every line.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn flush(&self) {}
}

pub fn config() -> PlatformConfig {
    PlatformConfig {
        console_url: "https://x.example.com/".into(),
        api_endpoint: "http://api.example.invalid".into(),
        api_token: "token".into(),
        account: "acme".into(),
        space_name: "dev".into(),
        cluster_name: "prod".into(),
        ..Default::default()
    }
}

/// Platform on the tokio clock; run tests with paused time.
pub fn platform(client: Arc<ScriptedClient>) -> (Platform, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let platform = Platform::new(config(), client, Arc::new(TokioClock), sink.clone())
        .expect("valid test config");
    (platform, sink)
}

pub fn status(status: &str, is_final_status: bool, is_succ: bool) -> ResourceStatus {
    ResourceStatus {
        status: status.into(),
        is_final_status,
        is_succ,
    }
}

pub fn service(status: &str, is_final_status: bool, is_succ: bool) -> ServiceDetails {
    ServiceDetails {
        unique_name: "svc-1".into(),
        service_name: "web".into(),
        resource: self::status(status, is_final_status, is_succ),
        extra: Default::default(),
    }
}

pub fn app_with(workload: &str, status: ResourceStatus) -> ApplicationStatus {
    let mut app = ApplicationStatus::default();
    app.workloads.insert(workload.to_string(), status);
    app
}

//! Platform facade: the entry point pipeline steps call.
//!
//! Owns the validated configuration, the API client and one
//! `OperationDriver`. Mutating calls go through the driver; lookups and
//! deletes go straight to the client.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::client::{ComponentRef, PlatformClient, ServiceDetails, ServiceRef, StartBuildRequest};
use crate::clock::Clock;
use crate::config::PlatformConfig;
use crate::driver::{OperationDriver, OperationResult, RunOptions};
use crate::error::{ClientError, ConfigError, DriverError};
use crate::links::DetailLinks;
use crate::monitor::OperationMonitor;
use crate::resources::{CreateService, StartBuild, UpdateComponent, UpdateService};
use crate::sink::LogSink;

pub struct Platform {
    config: PlatformConfig,
    client: Arc<dyn PlatformClient>,
    driver: OperationDriver,
}

impl Platform {
    pub fn new(
        config: PlatformConfig,
        client: Arc<dyn PlatformClient>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let links = DetailLinks::new(&config.console_url)?;
        let driver = OperationDriver::new(OperationMonitor::new(clock, sink), links);
        Ok(Self {
            config,
            client,
            driver,
        })
    }

    /// Stop waiting once `interrupt` turns `true`.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        let monitor = self.driver.monitor().clone().with_interrupt(interrupt);
        self.driver = OperationDriver::new(monitor, self.driver.links().clone());
        self
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn links(&self) -> &DetailLinks {
        self.driver.links()
    }

    /// Run options for service and component deploys.
    ///
    /// `timeout_secs` falls back to the configured deploy timeout.
    pub fn deploy_options(
        &self,
        asynchronous: bool,
        rollback_on_fail: bool,
        timeout_secs: Option<u64>,
    ) -> RunOptions {
        let timeout = timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.polling.deploy_timeout());
        RunOptions {
            asynchronous,
            ..RunOptions::wait(timeout).with_rollback(rollback_on_fail)
        }
    }

    // ── Builds ──────────────────────────────────────────────────

    /// Start a build; an empty space falls back to the configured one.
    ///
    /// Builds are capped by the configured build timeout.
    pub async fn start_build(
        &self,
        mut request: StartBuildRequest,
        asynchronous: bool,
        ignore_result: bool,
    ) -> Result<OperationResult, DriverError> {
        request.space_name = self
            .config
            .space_or(Some(request.space_name.as_str()))
            .to_string();
        let polling = &self.config.polling;
        let op = StartBuild::new(self.client.clone(), request, polling.build_interval());
        let options = RunOptions {
            asynchronous,
            ..RunOptions::wait(polling.build_timeout()).with_ignore_result(ignore_result)
        };
        self.driver.run(&op, &options).await
    }

    pub async fn delete_build(&self, build_id: &str) -> Result<(), ClientError> {
        tracing::info!(build_id, "deleting build");
        self.client.delete_build(build_id).await
    }

    pub async fn retrieve_build(&self, build_id: &str) -> Result<serde_json::Value, ClientError> {
        self.client.retrieve_build(build_id).await
    }

    // ── Services ────────────────────────────────────────────────

    pub async fn create_service(
        &self,
        payload: serde_json::Value,
        project_name: Option<&str>,
        options: &RunOptions,
    ) -> Result<OperationResult, DriverError> {
        let op = CreateService::new(
            self.client.clone(),
            payload,
            self.config.project_or(project_name),
            self.config.polling.service_interval(),
        );
        self.driver.run(&op, options).await
    }

    pub async fn update_service(
        &self,
        service_id: &str,
        payload: serde_json::Value,
        options: &RunOptions,
    ) -> Result<OperationResult, DriverError> {
        let op = UpdateService::new(
            self.client.clone(),
            service_id,
            payload,
            self.config.polling.service_interval(),
        );
        self.driver.run(&op, options).await
    }

    pub async fn retrieve_service(&self, service_id: &str) -> Result<ServiceDetails, ClientError> {
        self.client.retrieve_service(service_id).await
    }

    pub async fn retrieve_service_by_name(
        &self,
        service_name: &str,
        cluster_name: Option<&str>,
        namespace: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<ServiceDetails, ClientError> {
        let service = self.service_ref(service_name, cluster_name, namespace, project_name);
        self.client.retrieve_service_by_name(&service).await
    }

    pub async fn delete_service(
        &self,
        service_name: &str,
        cluster_name: Option<&str>,
        namespace: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<(), ClientError> {
        let service = self.service_ref(service_name, cluster_name, namespace, project_name);
        tracing::info!(service = %service.service_name, cluster = %service.cluster_name, "deleting service");
        self.client.delete_service(&service).await
    }

    fn service_ref(
        &self,
        service_name: &str,
        cluster_name: Option<&str>,
        namespace: Option<&str>,
        project_name: Option<&str>,
    ) -> ServiceRef {
        ServiceRef {
            service_name: service_name.to_string(),
            cluster_name: self.config.cluster_or(cluster_name).to_string(),
            namespace: self.config.namespace_or(namespace).to_string(),
            project_name: self.config.project_or(project_name).to_string(),
        }
    }

    // ── Components ──────────────────────────────────────────────

    /// Address a component, filling cluster and namespace from the config.
    pub fn component_ref(
        &self,
        application_name: &str,
        resource_type: &str,
        component_name: &str,
        cluster_name: Option<&str>,
        namespace: Option<&str>,
    ) -> ComponentRef {
        ComponentRef {
            cluster_name: self.config.cluster_or(cluster_name).to_string(),
            namespace: self.config.namespace_or(namespace).to_string(),
            application_name: application_name.to_string(),
            resource_type: resource_type.to_string(),
            component_name: component_name.to_string(),
        }
    }

    pub async fn update_component(
        &self,
        component: ComponentRef,
        payload: serde_json::Value,
        options: &RunOptions,
    ) -> Result<OperationResult, DriverError> {
        let polling = &self.config.polling;
        let op = UpdateComponent::new(
            self.client.clone(),
            component,
            payload,
            polling.component_interval(),
            polling.component_warmup(),
        );
        self.driver.run(&op, options).await
    }

    pub async fn retrieve_component(
        &self,
        component: &ComponentRef,
        project_name: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        self.client
            .retrieve_component(component, self.config.project_or(project_name))
            .await
    }

    // ── Integrations ────────────────────────────────────────────

    /// Integration instance details; an empty lookup is `ClientError::NotFound`.
    pub async fn retrieve_integration(
        &self,
        instance_uuid: &str,
        project_name: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        self.client
            .retrieve_integration(instance_uuid, self.config.project_or(project_name))
            .await?
            .ok_or_else(|| ClientError::NotFound("Integration".to_string()))
    }
}

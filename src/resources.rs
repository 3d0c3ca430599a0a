//! Per-kind `ResourceOperation`s: what to submit, how to poll it and how to
//! revert it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ComponentRef, PlatformClient, StartBuildRequest};
use crate::driver::ResourceOperation;
use crate::error::{ClientError, ConfigError};
use crate::monitor::{Operation, ResourceKind, StatusProvider};
use crate::providers::{BuildStatusProvider, ComponentStatusProvider, ServiceStatusProvider};
use crate::rollback::RollbackAction;

/// Payload label that carries the component's console id.
pub const COMPONENT_UUID_LABEL: &str = "service.alauda.io/uuid";

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingArgument { field });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

pub struct StartBuild {
    client: Arc<dyn PlatformClient>,
    request: StartBuildRequest,
    provider: BuildStatusProvider,
    interval: Duration,
}

impl StartBuild {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        request: StartBuildRequest,
        interval: Duration,
    ) -> Self {
        Self {
            provider: BuildStatusProvider::new(client.clone()),
            client,
            request,
            interval,
        }
    }
}

#[async_trait]
impl ResourceOperation for StartBuild {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Build
    }

    fn label(&self) -> String {
        format!(
            "Build:[{}/{}]",
            self.request.space_name, self.request.build_config_name
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require("build_config_name", &self.request.build_config_name)
    }

    async fn submit(&self) -> Result<String, ClientError> {
        self.client.start_build(&self.request).await
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        &self.provider
    }

    fn operation(&self, operation_id: &str, timeout: Duration) -> Operation {
        Operation::new(ResourceKind::Build, operation_id, self.interval, timeout)
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

pub struct CreateService {
    client: Arc<dyn PlatformClient>,
    payload: serde_json::Value,
    project_name: String,
    provider: ServiceStatusProvider,
    interval: Duration,
}

impl CreateService {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        payload: serde_json::Value,
        project_name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            provider: ServiceStatusProvider::new(client.clone()),
            client,
            payload,
            project_name: project_name.into(),
            interval,
        }
    }
}

#[async_trait]
impl ResourceOperation for CreateService {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn label(&self) -> String {
        "createService:".to_string()
    }

    async fn submit(&self) -> Result<String, ClientError> {
        self.client
            .create_service(&self.payload, &self.project_name)
            .await
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        &self.provider
    }

    fn operation(&self, operation_id: &str, timeout: Duration) -> Operation {
        Operation::new(ResourceKind::Service, operation_id, self.interval, timeout)
    }
}

pub struct UpdateService {
    client: Arc<dyn PlatformClient>,
    service_id: String,
    payload: serde_json::Value,
    provider: ServiceStatusProvider,
    rollback: ServiceRollback,
    interval: Duration,
}

impl UpdateService {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        service_id: impl Into<String>,
        payload: serde_json::Value,
        interval: Duration,
    ) -> Self {
        Self {
            provider: ServiceStatusProvider::new(client.clone()),
            rollback: ServiceRollback {
                client: client.clone(),
            },
            client,
            service_id: service_id.into(),
            payload,
            interval,
        }
    }
}

#[async_trait]
impl ResourceOperation for UpdateService {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn label(&self) -> String {
        "updateService:".to_string()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require("service_id", &self.service_id)
    }

    async fn submit(&self) -> Result<String, ClientError> {
        self.client
            .update_service(&self.service_id, &self.payload)
            .await
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        &self.provider
    }

    fn operation(&self, operation_id: &str, timeout: Duration) -> Operation {
        Operation::new(ResourceKind::Service, operation_id, self.interval, timeout)
    }

    fn rollback_action(&self) -> Option<&dyn RollbackAction> {
        Some(&self.rollback)
    }
}

/// Reverts a service to its previous revision.
pub struct ServiceRollback {
    client: Arc<dyn PlatformClient>,
}

#[async_trait]
impl RollbackAction for ServiceRollback {
    async fn rollback(&self, service_id: &str) -> Result<(), ClientError> {
        self.client.rollback_service(service_id).await
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

pub struct UpdateComponent {
    client: Arc<dyn PlatformClient>,
    component: ComponentRef,
    payload: serde_json::Value,
    provider: ComponentStatusProvider,
    rollback: ComponentRollback,
    interval: Duration,
    warmup: Duration,
}

impl UpdateComponent {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        component: ComponentRef,
        payload: serde_json::Value,
        interval: Duration,
        warmup: Duration,
    ) -> Self {
        Self {
            provider: ComponentStatusProvider::new(client.clone(), component.clone()),
            rollback: ComponentRollback {
                client: client.clone(),
                component: component.clone(),
            },
            client,
            component,
            payload,
            interval,
            warmup,
        }
    }
}

#[async_trait]
impl ResourceOperation for UpdateComponent {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Component
    }

    fn label(&self) -> String {
        format!(
            "updateComponent:[{}/{}]",
            self.component.application_name, self.component.component_name
        )
    }

    /// The component name doubles as the operation id.
    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.component;
        require("application_name", &c.application_name)?;
        require("resource_type", &c.resource_type)?;
        require("component_name", &c.component_name)
    }

    /// The platform returns nothing useful; the component name is the id.
    async fn submit(&self) -> Result<String, ClientError> {
        self.client
            .update_component(&self.component, &self.payload)
            .await?;
        Ok(self.component.component_name.clone())
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        &self.provider
    }

    fn operation(&self, operation_id: &str, timeout: Duration) -> Operation {
        Operation::new(ResourceKind::Component, operation_id, self.interval, timeout)
            .with_warmup(self.warmup)
    }

    fn link_id(&self, _operation_id: &str) -> String {
        component_uuid(&self.payload)
    }

    fn rollback_action(&self) -> Option<&dyn RollbackAction> {
        Some(&self.rollback)
    }
}

/// Reverts a component to its previous revision.
pub struct ComponentRollback {
    client: Arc<dyn PlatformClient>,
    component: ComponentRef,
}

#[async_trait]
impl RollbackAction for ComponentRollback {
    async fn rollback(&self, _component_name: &str) -> Result<(), ClientError> {
        self.client.rollback_component(&self.component).await
    }
}

/// `metadata.labels["service.alauda.io/uuid"]` of a Kubernetes payload, or `""`.
pub fn component_uuid(payload: &serde_json::Value) -> String {
    payload
        .pointer("/metadata/labels")
        .and_then(|labels| labels.get(COMPONENT_UUID_LABEL))
        .and_then(|uuid| uuid.as_str())
        .unwrap_or_default()
        .to_string()
}

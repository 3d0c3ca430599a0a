//! Status providers: one binding of `StatusProvider` per resource kind.
//!
//! Each provider turns a platform response into a classified
//! `StatusSnapshot` and sorts failures into transient and malformed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::{ComponentRef, PlatformClient};
use crate::error::StatusError;
use crate::monitor::classify::{classify_build, classify_flags};
use crate::monitor::{ResourceKind, StatusProvider, StatusSnapshot};

/// Reads the `status` code of a build document.
pub struct BuildStatusProvider {
    client: Arc<dyn PlatformClient>,
}

impl BuildStatusProvider {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusProvider for BuildStatusProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Build
    }

    async fn get_status(&self, build_id: &str) -> Result<StatusSnapshot, StatusError> {
        let build = self.client.retrieve_build(build_id).await?;
        let code = build
            .get("status")
            .and_then(|status| status.as_str())
            .ok_or_else(|| {
                StatusError::Malformed(format!("Got unexpected build data, data is {}", build))
            })?;
        Ok(StatusSnapshot::new(code, classify_build(code)))
    }
}

/// Reads the resource status of a service.
pub struct ServiceStatusProvider {
    client: Arc<dyn PlatformClient>,
}

impl ServiceStatusProvider {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusProvider for ServiceStatusProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    async fn get_status(&self, service_id: &str) -> Result<StatusSnapshot, StatusError> {
        let details = self.client.retrieve_service(service_id).await?;
        let resource = details.resource;
        Ok(StatusSnapshot::new(
            resource.status,
            classify_flags(resource.is_final_status, resource.is_succ),
        ))
    }
}

/// Reads one workload out of the application status.
///
/// The operation id is the component name; the rest of the address comes
/// from the `ComponentRef` the provider was built with.
pub struct ComponentStatusProvider {
    client: Arc<dyn PlatformClient>,
    component: ComponentRef,
}

impl ComponentStatusProvider {
    pub fn new(client: Arc<dyn PlatformClient>, component: ComponentRef) -> Self {
        Self { client, component }
    }
}

#[async_trait]
impl StatusProvider for ComponentStatusProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Component
    }

    async fn get_status(&self, _component_name: &str) -> Result<StatusSnapshot, StatusError> {
        let c = &self.component;
        tracing::debug!(
            cluster = %c.cluster_name,
            namespace = %c.namespace,
            application = %c.application_name,
            "retrieving application status"
        );
        let app_status = self
            .client
            .retrieve_application_status(&c.cluster_name, &c.namespace, &c.application_name)
            .await?;

        let workload = c.workload_name();
        // Right after an update the controller may not list the workload yet.
        let status = app_status.workloads.get(&workload).ok_or_else(|| {
            StatusError::Transient(format!("workload {} status can not be found", workload))
        })?;

        Ok(StatusSnapshot::new(
            status.status.clone(),
            classify_flags(status.is_final_status, status.is_succ),
        ))
    }
}

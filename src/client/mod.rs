//! PlatformClient trait: the boundary between pipeline steps and the
//! Alauda REST API.
//!
//! The steps depend on this trait, never on the HTTP implementation, so
//! tests substitute scripted clients.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub use http::HttpPlatformClient;

pub type Result<T> = std::result::Result<T, ClientError>;

// ─── Request / response types ────────────────────────────────────────────────

/// Trigger for a build config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartBuildRequest {
    pub space_name: String,
    pub build_config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Status object the platform attaches to services and workloads.
///
/// The `(is_final_status, is_succ)` pair is computed by the platform and
/// used as-is for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub status: String,
    pub is_final_status: bool,
    pub is_succ: bool,
}

/// Service as returned by the service API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetails {
    #[serde(default)]
    pub unique_name: String,
    #[serde(default)]
    pub service_name: String,
    pub resource: ResourceStatus,
    /// Remaining fields, passed through to step output untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-workload status of an application, keyed by workload name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default)]
    pub workloads: HashMap<String, ResourceStatus>,
}

/// Address of one component (workload) inside an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub cluster_name: String,
    pub namespace: String,
    pub application_name: String,
    pub resource_type: String,
    pub component_name: String,
}

impl ComponentRef {
    /// Key of this component in `ApplicationStatus::workloads`.
    pub fn workload_name(&self) -> String {
        format!(
            "{}-{}",
            self.resource_type.to_lowercase(),
            self.component_name
        )
    }
}

/// Name-based service lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub service_name: String,
    pub cluster_name: String,
    pub namespace: String,
    pub project_name: String,
}

// ---------------------------------------------------------------------------
// PlatformClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PlatformClient: Send + Sync {
    // ── Builds ──────────────────────────────────────────────────

    /// Start a build and return its id.
    async fn start_build(&self, request: &StartBuildRequest) -> Result<String>;

    /// Raw build document; its `status` field carries the build code.
    async fn retrieve_build(&self, build_id: &str) -> Result<serde_json::Value>;

    async fn delete_build(&self, build_id: &str) -> Result<()>;

    // ── Services ────────────────────────────────────────────────

    /// Create a service and return its id.
    async fn create_service(&self, payload: &serde_json::Value, project_name: &str)
        -> Result<String>;

    /// Update a service and return its id.
    async fn update_service(&self, service_id: &str, payload: &serde_json::Value)
        -> Result<String>;

    async fn retrieve_service(&self, service_id: &str) -> Result<ServiceDetails>;

    async fn retrieve_service_by_name(&self, service: &ServiceRef) -> Result<ServiceDetails>;

    async fn delete_service(&self, service: &ServiceRef) -> Result<()>;

    /// Ask the platform to revert the service to its previous revision.
    async fn rollback_service(&self, service_id: &str) -> Result<()>;

    // ── Components ──────────────────────────────────────────────

    async fn update_component(
        &self,
        component: &ComponentRef,
        payload: &serde_json::Value,
    ) -> Result<()>;

    async fn retrieve_component(
        &self,
        component: &ComponentRef,
        project_name: &str,
    ) -> Result<serde_json::Value>;

    async fn retrieve_application_status(
        &self,
        cluster_name: &str,
        namespace: &str,
        application_name: &str,
    ) -> Result<ApplicationStatus>;

    /// Ask the platform to revert the component to its previous revision.
    async fn rollback_component(&self, component: &ComponentRef) -> Result<()>;

    // ── Integrations ────────────────────────────────────────────

    /// Integration instance details; `None` when the account has no such
    /// instance.
    async fn retrieve_integration(
        &self,
        instance_uuid: &str,
        project_name: &str,
    ) -> Result<Option<serde_json::Value>>;
}

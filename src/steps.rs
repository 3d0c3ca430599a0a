//! Pipeline step requests.
//!
//! A step is a tagged YAML or JSON document, e.g.
//!
//! ```yaml
//! step: deploy_service
//! service_id: svc-1
//! rollback: true
//! payload: { ... }
//! ```
//!
//! Each request is validated before anything reaches the platform and
//! executes into a JSON value the pipeline can consume.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::StartBuildRequest;
use crate::driver::OperationResult;
use crate::error::{ClientError, ConfigError, StepError};
use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepRequest {
    StartBuild(StartBuildStep),
    DeleteBuild(DeleteBuildStep),
    DeployService(DeployServiceStep),
    DeployComponent(DeployComponentStep),
    RetrieveService(RetrieveServiceStep),
    RetrieveComponent(RetrieveComponentStep),
    RetrieveIntegration(RetrieveIntegrationStep),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartBuildStep {
    pub build_config_name: String,
    pub commit_id: Option<String>,
    pub branch: Option<String>,
    pub space_name: Option<String>,
    #[serde(rename = "async")]
    pub asynchronous: bool,
    pub ignore_build_result: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteBuildStep {
    pub build_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployServiceStep {
    /// Update this service when set, otherwise create a new one.
    pub service_id: Option<String>,
    pub project_name: Option<String>,
    pub payload: serde_json::Value,
    #[serde(rename = "async")]
    pub asynchronous: bool,
    pub rollback: bool,
    /// Seconds; the configured deploy timeout when absent.
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployComponentStep {
    pub application_name: String,
    pub resource_type: String,
    pub component_name: String,
    pub cluster_name: Option<String>,
    pub namespace: Option<String>,
    pub payload: serde_json::Value,
    #[serde(rename = "async")]
    pub asynchronous: bool,
    pub rollback: bool,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveServiceStep {
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub cluster_name: Option<String>,
    pub namespace: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveComponentStep {
    pub application_name: String,
    pub resource_type: String,
    pub component_name: String,
    pub cluster_name: Option<String>,
    pub namespace: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveIntegrationStep {
    pub instance_uuid: String,
    pub project_name: Option<String>,
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidStep {
        message: message.into(),
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn opt_is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, is_blank)
}

impl StepRequest {
    /// Parse a YAML or JSON step document and validate it.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let step: StepRequest =
            serde_yaml::from_str(text).map_err(|e| invalid(format!("unreadable step: {}", e)))?;
        step.validate()?;
        Ok(step)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StepRequest::StartBuild(_) => "start_build",
            StepRequest::DeleteBuild(_) => "delete_build",
            StepRequest::DeployService(_) => "deploy_service",
            StepRequest::DeployComponent(_) => "deploy_component",
            StepRequest::RetrieveService(_) => "retrieve_service",
            StepRequest::RetrieveComponent(_) => "retrieve_component",
            StepRequest::RetrieveIntegration(_) => "retrieve_integration",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StepRequest::StartBuild(s) => {
                if is_blank(&s.build_config_name) {
                    return Err(invalid("argument 'build_config_name' missed"));
                }
            }
            StepRequest::DeleteBuild(s) => {
                if is_blank(&s.build_id) {
                    return Err(invalid("argument 'build_id' missed"));
                }
            }
            StepRequest::DeployService(s) => {
                check_payload(&s.payload)?;
                check_timeout(s.timeout)?;
            }
            StepRequest::DeployComponent(s) => {
                check_component(&s.application_name, &s.resource_type, &s.component_name)?;
                check_payload(&s.payload)?;
                check_timeout(s.timeout)?;
            }
            StepRequest::RetrieveService(s) => {
                if opt_is_blank(&s.service_id) && opt_is_blank(&s.service_name) {
                    return Err(invalid("arguments missed: service_id or service_name is needed"));
                }
            }
            StepRequest::RetrieveComponent(s) => {
                check_component(&s.application_name, &s.resource_type, &s.component_name)?;
            }
            StepRequest::RetrieveIntegration(s) => {
                if is_blank(&s.instance_uuid) {
                    return Err(invalid("arguments missed: instance_uuid is needed"));
                }
            }
        }
        Ok(())
    }

    /// Run the step against the platform.
    pub async fn execute(&self, platform: &Platform) -> Result<serde_json::Value, StepError> {
        self.validate()?;
        tracing::info!(step = self.name(), "executing step");

        match self {
            StepRequest::StartBuild(s) => {
                let request = StartBuildRequest {
                    space_name: s.space_name.clone().unwrap_or_default(),
                    build_config_name: s.build_config_name.clone(),
                    commit_id: s.commit_id.clone(),
                    branch: s.branch.clone(),
                };
                let result = platform
                    .start_build(request, s.asynchronous, s.ignore_build_result)
                    .await?;
                Ok(result_json(&result))
            }
            StepRequest::DeleteBuild(s) => {
                platform.delete_build(&s.build_id).await?;
                Ok(json!({ "build_id": s.build_id, "deleted": true }))
            }
            StepRequest::DeployService(s) => {
                let options = platform.deploy_options(s.asynchronous, s.rollback, s.timeout);
                let result = match s.service_id.as_deref().filter(|id| !is_blank(id)) {
                    Some(service_id) => {
                        platform
                            .update_service(service_id, s.payload.clone(), &options)
                            .await?
                    }
                    None => {
                        platform
                            .create_service(
                                s.payload.clone(),
                                s.project_name.as_deref(),
                                &options,
                            )
                            .await?
                    }
                };
                Ok(result_json(&result))
            }
            StepRequest::DeployComponent(s) => {
                let component = platform.component_ref(
                    &s.application_name,
                    &s.resource_type,
                    &s.component_name,
                    s.cluster_name.as_deref(),
                    s.namespace.as_deref(),
                );
                let options = platform.deploy_options(s.asynchronous, s.rollback, s.timeout);
                let result = platform
                    .update_component(component, s.payload.clone(), &options)
                    .await?;
                Ok(result_json(&result))
            }
            StepRequest::RetrieveService(s) => {
                let details = match s.service_id.as_deref().filter(|id| !is_blank(id)) {
                    Some(service_id) => platform.retrieve_service(service_id).await?,
                    None => {
                        platform
                            .retrieve_service_by_name(
                                s.service_name.as_deref().unwrap_or_default(),
                                s.cluster_name.as_deref(),
                                s.namespace.as_deref(),
                                s.project_name.as_deref(),
                            )
                            .await?
                    }
                };
                serde_json::to_value(details)
                    .map_err(|e| StepError::Client(ClientError::Malformed(e.to_string())))
            }
            StepRequest::RetrieveComponent(s) => {
                let component = platform.component_ref(
                    &s.application_name,
                    &s.resource_type,
                    &s.component_name,
                    s.cluster_name.as_deref(),
                    s.namespace.as_deref(),
                );
                Ok(platform
                    .retrieve_component(&component, s.project_name.as_deref())
                    .await?)
            }
            StepRequest::RetrieveIntegration(s) => Ok(platform
                .retrieve_integration(&s.instance_uuid, s.project_name.as_deref())
                .await?),
        }
    }
}

fn check_payload(payload: &serde_json::Value) -> Result<(), ConfigError> {
    if payload.is_null() {
        return Err(invalid("argument 'payload' missed"));
    }
    if !payload.is_object() {
        return Err(invalid("argument 'payload' must be a mapping"));
    }
    Ok(())
}

fn check_timeout(timeout: Option<u64>) -> Result<(), ConfigError> {
    match timeout {
        Some(0) => Err(ConfigError::ZeroTimeout),
        _ => Ok(()),
    }
}

fn check_component(
    application_name: &str,
    resource_type: &str,
    component_name: &str,
) -> Result<(), ConfigError> {
    if is_blank(application_name) || is_blank(resource_type) || is_blank(component_name) {
        return Err(invalid(
            "arguments missed: application_name, resource_type and component_name is needed",
        ));
    }
    Ok(())
}

/// Step output for a driven operation.
pub fn result_json(result: &OperationResult) -> serde_json::Value {
    json!({
        "kind": result.kind,
        "id": result.id,
        "detail_link": result.detail_link,
        "outcome": result.outcome.as_ref().map(|o| o.label()),
        "status": result.outcome.as_ref().and_then(|o| o.status()),
    })
}

//! HTTP implementation of `PlatformClient` over the Alauda REST API.
//!
//! Connection failures and non-2xx answers become transient `ClientError`s;
//! bodies that do not decode become `ClientError::Malformed`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ApplicationStatus, ComponentRef, PlatformClient, Result, ServiceDetails, ServiceRef,
    StartBuildRequest,
};
use crate::config::PlatformConfig;
use crate::error::ClientError;

/// Per-request timeout. The monitor's deadline bounds the overall wait.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Alauda API client.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    client: Client,
    /// API endpoint without a trailing slash.
    base_url: String,
    token: String,
    account: String,
}

#[derive(Debug, Serialize)]
struct BuildTrigger<'a> {
    build_config_name: &'a str,
    space_name: &'a str,
    code_repo: CodeRepo<'a>,
}

#[derive(Debug, Serialize)]
struct CodeRepo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    code_repo_head_commit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_repo_branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct BuildCreated {
    build_id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceCreated {
    unique_name: String,
}

impl HttpPlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_endpoint.trim().trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            account: config.account.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", self.token),
        )
    }

    /// Send and reject non-2xx answers, keeping the body for diagnostics.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.send(self.client.get(&url).query(query)).await?;
        Ok(response.json::<T>().await?)
    }

    fn build_path(&self, build_id: Option<&str>) -> String {
        match build_id {
            Some(id) => format!("v1/private-builds/{}/{}", self.account, id),
            None => format!("v1/private-builds/{}", self.account),
        }
    }

    fn service_path(&self, service: &str) -> String {
        format!("v2/services/{}/{}", self.account, service)
    }

    fn integration_path(&self, instance_uuid: &str) -> String {
        format!("v1/integrations/{}/{}", self.account, instance_uuid)
    }

    fn component_path(component: &ComponentRef) -> String {
        format!(
            "v2/apps/{}/{}/{}/{}/{}",
            component.cluster_name,
            component.namespace,
            component.application_name,
            component.resource_type.to_lowercase(),
            component.component_name
        )
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn start_build(&self, request: &StartBuildRequest) -> Result<String> {
        let body = BuildTrigger {
            build_config_name: &request.build_config_name,
            space_name: &request.space_name,
            code_repo: CodeRepo {
                code_repo_head_commit: request.commit_id.as_deref(),
                code_repo_branch: request.branch.as_deref(),
            },
        };
        let response = self
            .send(self.client.post(self.url(&self.build_path(None))).json(&body))
            .await?;
        let created: BuildCreated = response.json().await?;
        Ok(created.build_id)
    }

    async fn retrieve_build(&self, build_id: &str) -> Result<serde_json::Value> {
        self.get_json(&self.build_path(Some(build_id)), &[]).await
    }

    async fn delete_build(&self, build_id: &str) -> Result<()> {
        self.send(self.client.delete(self.url(&self.build_path(Some(build_id)))))
            .await?;
        Ok(())
    }

    async fn create_service(
        &self,
        payload: &serde_json::Value,
        project_name: &str,
    ) -> Result<String> {
        let url = self.url(&format!("v2/services/{}", self.account));
        let response = self
            .send(
                self.client
                    .post(url)
                    .query(&[("project_name", project_name)])
                    .json(payload),
            )
            .await?;
        let created: ServiceCreated = response.json().await?;
        Ok(created.unique_name)
    }

    async fn update_service(
        &self,
        service_id: &str,
        payload: &serde_json::Value,
    ) -> Result<String> {
        self.send(
            self.client
                .put(self.url(&self.service_path(service_id)))
                .json(payload),
        )
        .await?;
        Ok(service_id.to_string())
    }

    async fn retrieve_service(&self, service_id: &str) -> Result<ServiceDetails> {
        self.get_json(&self.service_path(service_id), &[]).await
    }

    async fn retrieve_service_by_name(&self, service: &ServiceRef) -> Result<ServiceDetails> {
        self.get_json(
            &self.service_path(&service.service_name),
            &[
                ("cluster_name", service.cluster_name.as_str()),
                ("namespace", service.namespace.as_str()),
                ("project_name", service.project_name.as_str()),
            ],
        )
        .await
    }

    async fn delete_service(&self, service: &ServiceRef) -> Result<()> {
        self.send(
            self.client
                .delete(self.url(&self.service_path(&service.service_name)))
                .query(&[
                    ("cluster_name", service.cluster_name.as_str()),
                    ("namespace", service.namespace.as_str()),
                    ("project_name", service.project_name.as_str()),
                ]),
        )
        .await?;
        Ok(())
    }

    async fn rollback_service(&self, service_id: &str) -> Result<()> {
        let path = format!("{}/rollback", self.service_path(service_id));
        self.send(self.client.put(self.url(&path))).await?;
        Ok(())
    }

    async fn update_component(
        &self,
        component: &ComponentRef,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let path = format!(
            "v2/kubernetes/clusters/{}/{}/{}/{}",
            component.cluster_name,
            component.resource_type.to_lowercase(),
            component.namespace,
            component.component_name
        );
        self.send(self.client.put(self.url(&path)).json(payload))
            .await?;
        Ok(())
    }

    async fn retrieve_component(
        &self,
        component: &ComponentRef,
        project_name: &str,
    ) -> Result<serde_json::Value> {
        self.get_json(
            &Self::component_path(component),
            &[("project_name", project_name)],
        )
        .await
    }

    async fn retrieve_application_status(
        &self,
        cluster_name: &str,
        namespace: &str,
        application_name: &str,
    ) -> Result<ApplicationStatus> {
        let path = format!(
            "v2/apps/{}/{}/{}/status",
            cluster_name, namespace, application_name
        );
        self.get_json(&path, &[]).await
    }

    async fn rollback_component(&self, component: &ComponentRef) -> Result<()> {
        let path = format!("{}/rollback", Self::component_path(component));
        self.send(self.client.put(self.url(&path))).await?;
        Ok(())
    }

    async fn retrieve_integration(
        &self,
        instance_uuid: &str,
        project_name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let path = self.integration_path(instance_uuid);
        match self
            .get_json::<serde_json::Value>(&path, &[("project_name", project_name)])
            .await
        {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(details) => Ok(Some(details)),
            Err(ClientError::UnexpectedStatus { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

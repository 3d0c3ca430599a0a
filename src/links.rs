//! Console detail links.
//!
//! Every terminal error names the console page of its operation, so an
//! operator can find it without digging the id out of the logs.

use url::Url;

use crate::error::ConfigError;
use crate::monitor::ResourceKind;

const BUILD_PATH: &str = "console/build/history/detail/";
const SERVICE_PATH: &str = "console/k8s_service/detail/";
const COMPONENT_PATH: &str = "console/k8s_app/detail/component/";

/// Builds detail links from the configured console base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLinks {
    /// Always ends with exactly one `/`.
    base: String,
}

impl DetailLinks {
    pub fn new(console_url: &str) -> Result<Self, ConfigError> {
        let trimmed = console_url.trim();
        Url::parse(trimmed).map_err(|e| ConfigError::InvalidConsoleUrl {
            url: console_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base: format!("{}/", trimmed.trim_end_matches('/')),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn build(&self, build_id: &str) -> String {
        self.join(BUILD_PATH, build_id)
    }

    pub fn service(&self, service_id: &str) -> String {
        self.join(SERVICE_PATH, service_id)
    }

    pub fn component(&self, component_id: &str) -> String {
        self.join(COMPONENT_PATH, component_id)
    }

    pub fn for_kind(&self, kind: ResourceKind, id: &str) -> String {
        match kind {
            ResourceKind::Build => self.build(id),
            ResourceKind::Service => self.service(id),
            ResourceKind::Component => self.component(id),
        }
    }

    fn join(&self, path: &str, id: &str) -> String {
        format!("{}{}{}", self.base, path, id)
    }
}

//! Platform configuration: load from YAML, overlay environment, validate.
//!
//! The configuration is an explicit value handed to `Platform::new`; nothing
//! in the crate reads it from global state.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_CONSOLE_URL: &str = "ALAUDA_CONSOLE_URL";
pub const ENV_API_ENDPOINT: &str = "ALAUDA_API_ENDPOINT";
pub const ENV_API_TOKEN: &str = "ALAUDA_API_TOKEN";
pub const ENV_ACCOUNT: &str = "ALAUDA_ACCOUNT";
pub const ENV_SPACE: &str = "ALAUDA_SPACE";
pub const ENV_CLUSTER: &str = "ALAUDA_CLUSTER";
pub const ENV_NAMESPACE: &str = "ALAUDA_NAMESPACE";
pub const ENV_PROJECT: &str = "ALAUDA_PROJECT";

const DEFAULT_NAMESPACE: &str = "default";

// ---------------------------------------------------------------------------
// PlatformConfig
// ---------------------------------------------------------------------------

/// Connection and scope settings for the Alauda platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the web console, used for detail links.
    pub console_url: String,
    /// Base URL of the REST API.
    pub api_endpoint: String,
    pub api_token: String,
    pub account: String,
    pub space_name: String,
    pub cluster_name: String,
    pub namespace: String,
    pub project_name: String,
    pub verbose: bool,
    pub polling: PollingConfig,
}

impl PlatformConfig {
    /// Load from a YAML file. Environment overrides are not applied.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        let config: PlatformConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Parsing {}", path.display()))?;
        Ok(config)
    }

    /// Overlay `ALAUDA_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields: [(&str, &mut String); 8] = [
            (ENV_CONSOLE_URL, &mut self.console_url),
            (ENV_API_ENDPOINT, &mut self.api_endpoint),
            (ENV_API_TOKEN, &mut self.api_token),
            (ENV_ACCOUNT, &mut self.account),
            (ENV_SPACE, &mut self.space_name),
            (ENV_CLUSTER, &mut self.cluster_name),
            (ENV_NAMESPACE, &mut self.namespace),
            (ENV_PROJECT, &mut self.project_name),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                let value = value.trim();
                if !value.is_empty() {
                    *field = value.to_string();
                }
            }
        }
        self
    }

    /// Check that everything needed to talk to the platform is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("console_url", &self.console_url),
            ("api_endpoint", &self.api_endpoint),
            ("account", &self.account),
            ("api_token", &self.api_token),
            ("cluster_name", &self.cluster_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { field });
            }
        }
        self.polling.validate()
    }

    /// Namespace, defaulting to `"default"` when unset.
    pub fn namespace(&self) -> &str {
        if self.namespace.trim().is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }

    /// Step override when non-empty, else the configured space.
    pub fn space_or<'a>(&'a self, step_value: Option<&'a str>) -> &'a str {
        non_empty(step_value).unwrap_or(self.space_name.as_str())
    }

    pub fn cluster_or<'a>(&'a self, step_value: Option<&'a str>) -> &'a str {
        non_empty(step_value).unwrap_or(self.cluster_name.as_str())
    }

    pub fn namespace_or<'a>(&'a self, step_value: Option<&'a str>) -> &'a str {
        non_empty(step_value).unwrap_or_else(|| self.namespace())
    }

    pub fn project_or<'a>(&'a self, step_value: Option<&'a str>) -> &'a str {
        non_empty(step_value).unwrap_or(self.project_name.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// PollingConfig
// ---------------------------------------------------------------------------

/// Poll cadence per resource kind, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub build_interval_secs: u64,
    /// Builds have no caller-supplied timeout; this caps them.
    pub build_timeout_secs: u64,
    pub service_interval_secs: u64,
    pub component_interval_secs: u64,
    /// Gives the remote controller time to pick up a component update.
    pub component_warmup_secs: u64,
    /// Used by deploy steps that do not set a timeout.
    pub deploy_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            build_interval_secs: 5,
            build_timeout_secs: 2 * 60 * 60,
            service_interval_secs: 10,
            component_interval_secs: 5,
            component_warmup_secs: 2,
            deploy_timeout_secs: 600,
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            self.build_interval_secs,
            self.service_interval_secs,
            self.component_interval_secs,
        ];
        if intervals.contains(&0) {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.build_timeout_secs == 0 || self.deploy_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn build_interval(&self) -> Duration {
        Duration::from_secs(self.build_interval_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn service_interval(&self) -> Duration {
        Duration::from_secs(self.service_interval_secs)
    }

    pub fn component_interval(&self) -> Duration {
        Duration::from_secs(self.component_interval_secs)
    }

    pub fn component_warmup(&self) -> Duration {
        Duration::from_secs(self.component_warmup_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

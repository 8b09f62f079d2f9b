//! simbridge.toml configuration.
//!
//! Every field has a default, so an absent file or a partial file is
//! valid. Command-line flags override individual fields after loading.

use std::path::Path;
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use simbridge_api::WaitBudgets;
use simbridge_reconcile::ConvergenceBudget;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub extender: ExtenderConfig,
    pub scheduler: SchedulerConfig,
    pub convergence: ConvergenceConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtenderConfig {
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the background scheduling ticker.
    pub enabled: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub node_attempts: u32,
    pub node_delay_ms: u64,
    pub job_attempts: u32,
    pub job_delay_ms: u64,
}

/// Settings for the in-process simulated orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub namespace: String,
    /// Readiness polls before a new node reports ready.
    pub ready_after_polls: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for ExtenderConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 500,
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            node_attempts: 20,
            node_delay_ms: 1_000,
            job_attempts: 30,
            job_delay_ms: 1_000,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            ready_after_polls: 1,
        }
    }
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.enabled && self.scheduler.interval_ms == 0 {
            bail!("scheduler.interval_ms must be positive when the ticker is enabled");
        }
        if self.extender.timeout_ms == 0 {
            bail!("extender.timeout_ms must be positive");
        }
        if self.extender.url.trim().is_empty() {
            bail!("extender.url must be set");
        }
        Ok(())
    }

    pub fn extender_timeout(&self) -> Duration {
        Duration::from_millis(self.extender.timeout_ms)
    }

    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.interval_ms)
    }

    pub fn wait_budgets(&self) -> WaitBudgets {
        let c = &self.convergence;
        WaitBudgets {
            nodes: ConvergenceBudget::new(c.node_attempts, Duration::from_millis(c.node_delay_ms)),
            jobs: ConvergenceBudget::new(c.job_attempts, Duration::from_millis(c.job_delay_ms)),
        }
    }
}

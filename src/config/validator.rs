//! Local shape validation for resource configs.
//!
//! Only catches values the server could never accept (empty image, zero
//! counts). Quota, pricing and region availability are left to the provider.

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::settings::PollPolicy;
use super::spec::{DeploymentConfig, GpuConfig};

/// Validator for resource configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a GPU config.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate_gpu(&self, config: &GpuConfig) -> Result<()> {
        debug!("Validating GPU config");

        require_non_empty(&config.gpu_name, "name")?;
        require_non_empty(&config.image, "image")?;
        require_non_empty(&config.region, "region")?;
        require_positive(config.gpu_count, "count")?;

        Ok(())
    }

    /// Validates a CPU deployment config.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate_cpu(&self, config: &DeploymentConfig) -> Result<()> {
        debug!("Validating CPU deployment config");

        require_non_empty(&config.image, "image")?;
        require_non_empty(&config.region, "region")?;
        require_positive(config.cpu, "cpu")?;
        require_positive(config.ram, "ram")?;
        require_positive(config.hdd, "hdd")?;

        if config.network_uuid.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::validation("network id must not be blank", "network_uuid").into());
        }

        Ok(())
    }

    /// Validates the provisioning poll budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll would never check the status.
    pub fn validate_policy(&self, policy: &PollPolicy) -> Result<()> {
        require_positive(policy.max_attempts, "max_attempts")
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::validation(format!("{field} must not be empty"), field).into());
    }
    Ok(())
}

fn require_positive(value: u32, field: &str) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::validation(format!("{field} must be at least 1"), field).into());
    }
    Ok(())
}

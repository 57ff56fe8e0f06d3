//! Client-level settings shared by every command.
//!
//! A single [`ClientConfig`] is built once by the CLI layer and passed by
//! reference into the client and the command runner; nothing here reads the
//! process environment.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default provider API base URL.
pub const DEFAULT_API_URL: &str = "https://app.nodeshift.com/api";

/// Default result artifact location.
pub const DEFAULT_RESULT_PATH: &str = "result";

/// Default warm-up delay before the first status check, in seconds.
pub const DEFAULT_WARMUP_SECS: u64 = 30;

/// Default delay between status checks, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default maximum number of status checks.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Access key used when no key pair is configured.
pub const ANONYMOUS_ACCESS_KEY: &str = "anonymous";

/// Signing credentials.
///
/// Either a static key pair or the fixed anonymous identity. The secret is
/// never printed by the `Debug` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    anonymous: bool,
}

impl Credentials {
    /// Builds credentials from an optional key pair.
    ///
    /// Falls back to the anonymous identity when either half is empty.
    #[must_use]
    pub fn from_keys(access_key: &str, secret_key: &str) -> Self {
        if access_key.is_empty() || secret_key.is_empty() {
            return Self::anonymous();
        }

        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            anonymous: false,
        }
    }

    /// The keyless anonymous identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            access_key: String::from(ANONYMOUS_ACCESS_KEY),
            secret_key: String::new(),
            anonymous: true,
        }
    }

    /// Access key identifier.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Secret signing key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Whether this is the anonymous identity.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("anonymous", &self.anonymous)
            .finish()
    }
}

/// Timing and budget of the provisioning poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the first status check.
    pub warmup: Duration,
    /// Delay between consecutive status checks.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(DEFAULT_WARMUP_SECS),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// A policy with no delays, for tests and scripted runs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            warmup: Duration::ZERO,
            interval: Duration::ZERO,
            max_attempts,
        }
    }
}

/// Settings for the API client and the command runner.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Signing credentials.
    pub credentials: Credentials,
    /// API base URL, including the routed prefix.
    pub base_url: String,
    /// Request timeout; the client default applies when unset or zero.
    pub timeout: Option<Duration>,
    /// Result artifact path.
    pub result_path: PathBuf,
}

impl ClientConfig {
    /// Creates a configuration with default URL, timeout and artifact path.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: String::from(DEFAULT_API_URL),
            timeout: None,
            result_path: PathBuf::from(DEFAULT_RESULT_PATH),
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the result artifact path.
    #[must_use]
    pub fn with_result_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_path = path.into();
        self
    }

    /// Returns the base URL without a trailing slash, checked for validity.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn normalized_base_url(&self) -> Result<String> {
        let trimmed = self.base_url.trim_end_matches('/');
        reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;
        Ok(trimmed.to_string())
    }
}

/// Loads the .env file from the working directory if present.
///
/// # Errors
///
/// Returns an error if the .env file exists but cannot be loaded.
pub fn load_dotenv() -> Result<()> {
    let env_path = PathBuf::from(".env");

    if env_path.exists() {
        dotenvy::from_path(&env_path).map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load .env file: {e}"),
            location: Some(env_path.display().to_string()),
        })?;
    }

    Ok(())
}

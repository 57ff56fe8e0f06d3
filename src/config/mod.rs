//! Configuration module for the deployment client.
//!
//! This module provides the immutable settings and resource shapes the CLI
//! layer builds once per invocation, plus local shape validation.

mod settings;
mod spec;
mod validator;

pub use settings::{
    load_dotenv, ClientConfig, Credentials, PollPolicy, ANONYMOUS_ACCESS_KEY, DEFAULT_API_URL,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RESULT_PATH, DEFAULT_WARMUP_SECS,
};
pub use spec::{DeploymentConfig, GpuConfig, DEFAULT_GPU_REGION, DEFAULT_IMAGE};
pub use validator::ConfigValidator;

//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap, and
//! converts parsed flags into library configuration values.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    ClientConfig, Credentials, DeploymentConfig, GpuConfig, PollPolicy, DEFAULT_API_URL,
    DEFAULT_GPU_REGION, DEFAULT_IMAGE, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RESULT_PATH, DEFAULT_WARMUP_SECS,
};

/// Deploy - create and delete GPU instances and CPU deployments.
#[derive(Parser, Debug)]
#[command(name = "deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// API access key; anonymous credentials are used when unset.
    #[arg(long, global = true, env = "DWS_ACCESS_KEY", default_value = "", hide_env_values = true)]
    pub access_key: String,

    /// API secret key; anonymous credentials are used when unset.
    #[arg(long, global = true, env = "DWS_SECRET_KEY", default_value = "", hide_env_values = true)]
    pub secret_key: String,

    /// API base URL.
    #[arg(long, global = true, env = "DWS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "DWS_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Path of the result file.
    #[arg(long, global = true, env = "DWS_RESULT_PATH", default_value = DEFAULT_RESULT_PATH)]
    pub result: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage GPU instances.
    Gpu {
        /// GPU subcommand.
        #[command(subcommand)]
        command: GpuCommands,
    },

    /// Manage CPU deployments.
    Cpu {
        /// CPU subcommand.
        #[command(subcommand)]
        command: CpuCommands,
    },
}

/// GPU subcommands.
#[derive(Subcommand, Debug)]
pub enum GpuCommands {
    /// Rent a GPU and wait until it is running.
    Create(GpuCreateArgs),

    /// Delete a rented GPU.
    Delete {
        /// GPU identifier.
        #[arg(long)]
        uuid: String,
    },
}

/// CPU subcommands.
#[derive(Subcommand, Debug)]
pub enum CpuCommands {
    /// Create a CPU deployment.
    Create(CpuCreateArgs),

    /// Delete a CPU deployment.
    Delete {
        /// Deployment identifier.
        #[arg(long)]
        uuid: String,
    },
}

/// Arguments of `gpu create`.
#[derive(Args, Debug, Clone)]
pub struct GpuCreateArgs {
    /// GPU model, e.g. `RTX_2080`.
    #[arg(long)]
    pub name: String,

    /// Container image.
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Public SSH key installed on the instance.
    #[arg(long, env = "DWS_SSH_KEY")]
    pub ssh_key: String,

    /// Number of GPUs.
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Region.
    #[arg(long, default_value = DEFAULT_GPU_REGION)]
    pub region: String,

    /// Seconds to wait before the first status check.
    #[arg(long, env = "DWS_WARMUP_SECS", default_value_t = DEFAULT_WARMUP_SECS)]
    pub warmup_secs: u64,

    /// Seconds between status checks.
    #[arg(long, env = "DWS_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Maximum number of status checks.
    #[arg(
        long,
        env = "DWS_MAX_ATTEMPTS",
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,
}

/// Arguments of `cpu create`.
#[derive(Args, Debug, Clone)]
pub struct CpuCreateArgs {
    /// Region.
    #[arg(long)]
    pub region: String,

    /// Operating system image.
    #[arg(long)]
    pub image: String,

    /// Number of vCPUs.
    #[arg(long)]
    pub cpu: u32,

    /// Memory in GB.
    #[arg(long)]
    pub ram: u32,

    /// Disk size in GB.
    #[arg(long)]
    pub hdd: u32,

    /// Disk type.
    #[arg(long, default_value = "ssd")]
    pub hdd_type: String,

    /// Assign a public IPv4 address.
    #[arg(long)]
    pub ipv4: bool,

    /// Public SSH key installed on the machine.
    #[arg(long, env = "DWS_SSH_KEY")]
    pub ssh_key: String,

    /// Name under which the SSH key is stored.
    #[arg(long, default_value = "")]
    pub ssh_key_name: String,

    /// Host name of the machine.
    #[arg(long, default_value = "")]
    pub host_name: String,

    /// Private network to attach.
    #[arg(long)]
    pub network_uuid: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the client configuration from the shared flags.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(Credentials::from_keys(&self.access_key, &self.secret_key))
            .with_base_url(self.api_url.clone())
            .with_result_path(self.result.clone());
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    /// Poll policy for the selected command.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        match &self.command {
            Commands::Gpu {
                command: GpuCommands::Create(args),
            } => args.poll_policy(),
            _ => PollPolicy::default(),
        }
    }
}

impl GpuCreateArgs {
    /// Request body for the GPU create call.
    #[must_use]
    pub fn to_config(&self) -> GpuConfig {
        GpuConfig::new(self.name.clone(), self.ssh_key.clone())
            .with_image(self.image.clone())
            .with_count(self.count)
            .with_region(self.region.clone())
    }

    /// Poll timing for this command.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            warmup: Duration::from_secs(self.warmup_secs),
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

impl CpuCreateArgs {
    /// Request body for the CPU create call.
    #[must_use]
    pub fn to_config(&self) -> DeploymentConfig {
        DeploymentConfig {
            region: self.region.clone(),
            image: self.image.clone(),
            cpu: self.cpu,
            ram: self.ram,
            hdd: self.hdd,
            hdd_type: self.hdd_type.clone(),
            ipv4: self.ipv4,
            ssh_key: self.ssh_key.clone(),
            ssh_key_name: self.ssh_key_name.clone(),
            host_name: self.host_name.clone(),
            network_uuid: self.network_uuid.clone(),
        }
    }
}

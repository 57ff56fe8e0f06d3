//! Result artifact reporting.
//!
//! Each command ends by writing a small `key=value` file that the invoking
//! automation reads back. The write is an atomic overwrite and never fails
//! the command: persistence errors are logged and swallowed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::dws::{Endpoints, ResourceKind};
use crate::error::Result;

/// Why a create did not end with a usable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The create call itself failed.
    CreateFailed {
        /// Error message.
        message: String,
    },
    /// The server reported a terminal failure status.
    TerminalStatus {
        /// Reported status.
        status: String,
    },
    /// The poll budget was exhausted.
    TimedOut {
        /// Number of checks performed.
        attempts: u32,
    },
    /// The command was cancelled.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed { message } => write!(f, "create failed: {message}"),
            Self::TerminalStatus { status } => write!(f, "terminal status '{status}'"),
            Self::TimedOut { attempts } => write!(f, "not running after {attempts} checks"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final result of a create command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningOutcome {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource identifier; empty if the create call failed.
    pub id: String,
    /// Best known connection data.
    pub endpoints: Endpoints,
    /// Failure reason, if the resource is not usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

/// Final result of a delete command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource identifier.
    pub id: String,
    /// Whether the server accepted the delete.
    pub success: bool,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Outcome {
    /// A create command.
    Create(ProvisioningOutcome),
    /// A delete command.
    Delete(DeletionOutcome),
}

impl Outcome {
    /// A create that failed before the server assigned an identifier.
    #[must_use]
    pub fn create_failed(kind: ResourceKind, message: impl Into<String>) -> Self {
        Self::Create(ProvisioningOutcome {
            kind,
            id: String::new(),
            endpoints: Endpoints::default(),
            failure: Some(FailureReason::CreateFailed {
                message: message.into(),
            }),
        })
    }

    /// A delete that was not accepted.
    #[must_use]
    pub fn delete_failed(kind: ResourceKind, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delete(DeletionOutcome {
            kind,
            id: id.into(),
            success: false,
            error: Some(message.into()),
        })
    }

    /// Whether the command succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Create(outcome) => outcome.failure.is_none(),
            Self::Delete(outcome) => outcome.success,
        }
    }
}

/// Ordered `key=value` lines of the result file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultArtifact {
    entries: Vec<(String, String)>,
}

impl ResultArtifact {
    /// Creates an empty artifact.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a field. Line breaks in the value are dropped so that one
    /// field always renders as one line.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        let value: String = value
            .to_string()
            .chars()
            .filter(|c| !matches!(c, '\r' | '\n'))
            .collect();
        self.entries.push((key.into(), value));
    }

    /// Looks up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the artifact as text, one line per field.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }

    /// Parses artifact text back into fields.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }
}

impl From<&Outcome> for ResultArtifact {
    fn from(outcome: &Outcome) -> Self {
        let mut artifact = Self::new();

        match outcome {
            Outcome::Create(created) => {
                let endpoints = &created.endpoints;
                match created.kind {
                    ResourceKind::Gpu => {
                        artifact.push("uuid", &created.id);
                        artifact.push("host", endpoints.ssh_host.as_deref().unwrap_or_default());
                        artifact.push("port", endpoints.ssh_port.unwrap_or_default());
                    }
                    ResourceKind::Cpu => {
                        artifact.push("id", &created.id);
                        artifact.push("ip", endpoints.ip.as_deref().unwrap_or_default());
                        artifact.push("ipv6", endpoints.ipv6.as_deref().unwrap_or_default());
                        artifact.push("ygg", endpoints.ygg.as_deref().unwrap_or_default());
                    }
                }
            }
            Outcome::Delete(deleted) => artifact.push("success", deleted.success),
        }

        artifact
    }
}

/// Writes the result artifact.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    /// Artifact location.
    path: PathBuf,
}

impl ResultReporter {
    /// Creates a reporter writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Artifact location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the outcome. Failures are logged, never returned.
    pub async fn report(&self, outcome: &Outcome) {
        let artifact = ResultArtifact::from(outcome);
        debug!("Result:\n{}", artifact.render());

        match self.write(&artifact).await {
            Ok(()) => info!("Result written to {}", self.path.display()),
            Err(e) => error!("Failed to write result to {}: {e}", self.path.display()),
        }
    }

    /// Sibling path the artifact is staged at before the rename.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Writes to a temporary file first, then renames over the artifact.
    /// The temporary file is removed if any step fails.
    async fn write(&self, artifact: &ResultArtifact) -> Result<()> {
        let temp_path = self.temp_path();

        let result = Self::stage_and_rename(&temp_path, &self.path, artifact).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                debug!("Could not remove {}: {e}", temp_path.display());
            }
        }
        result
    }

    async fn stage_and_rename(temp_path: &Path, path: &Path, artifact: &ResultArtifact) -> Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(artifact.render().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp_path, path).await?;
        Ok(())
    }
}

//! Command runner.
//!
//! One method per top-level command. Every method, whatever happens, writes
//! the result artifact exactly once before returning.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{ClientConfig, ConfigValidator, DeploymentConfig, GpuConfig, PollPolicy};
use crate::dws::{ClientProbe, DwsClient, PollState, ProvisioningPoller, ResourceKind};
use crate::error::{DeployError, ProvisionError, Result};
use crate::report::{DeletionOutcome, FailureReason, Outcome, ProvisioningOutcome, ResultReporter};

/// Outcome of a command plus the error that should fail the process, if any.
#[derive(Debug)]
pub struct CommandResult {
    /// What was reported.
    pub outcome: Outcome,
    /// Unrecovered error.
    pub error: Option<DeployError>,
}

impl CommandResult {
    /// Returns the outcome, or the error if the command failed.
    ///
    /// # Errors
    ///
    /// Returns the unrecovered error of the command.
    pub fn into_result(self) -> Result<Outcome> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.outcome),
        }
    }

    /// Whether the command succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs create and delete commands against the provider.
#[derive(Debug)]
pub struct Deployer {
    client: DwsClient,
    poller: ProvisioningPoller,
    reporter: ResultReporter,
    validator: ConfigValidator,
}

impl Deployer {
    /// Creates a runner from the shared configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll policy is invalid or the API client
    /// cannot be created.
    pub fn new(config: &ClientConfig, policy: PollPolicy, cancel: CancellationToken) -> Result<Self> {
        ConfigValidator::new().validate_policy(&policy)?;
        let client = DwsClient::new(config)?.with_cancellation(cancel.clone());
        Ok(Self::from_parts(
            client,
            ProvisioningPoller::new(policy, cancel),
            ResultReporter::new(config.result_path.clone()),
        ))
    }

    /// Assembles a runner from existing parts.
    #[must_use]
    pub const fn from_parts(
        client: DwsClient,
        poller: ProvisioningPoller,
        reporter: ResultReporter,
    ) -> Self {
        Self {
            client,
            poller,
            reporter,
            validator: ConfigValidator::new(),
        }
    }

    /// Creates a GPU instance and waits for it to run.
    pub async fn create_gpu(&self, config: &GpuConfig) -> CommandResult {
        info!("Creating GPU instance: {config:?}");
        let validation = self.validator.validate_gpu(config);
        self.create(ResourceKind::Gpu, config, validation).await
    }

    /// Creates a CPU deployment.
    pub async fn create_cpu(&self, config: &DeploymentConfig) -> CommandResult {
        info!("Creating CPU deployment: {config:?}");
        let validation = self.validator.validate_cpu(config);
        self.create(ResourceKind::Cpu, config, validation).await
    }

    /// Deletes a resource.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> CommandResult {
        info!("Deleting {kind} instance with uuid {id}");

        match self.client.delete(kind, id).await {
            Ok(()) => {
                let outcome = Outcome::Delete(DeletionOutcome {
                    kind,
                    id: id.to_string(),
                    success: true,
                    error: None,
                });
                self.finish(outcome, None).await
            }
            Err(e) => {
                let outcome = Outcome::delete_failed(kind, id, e.to_string());
                self.finish(outcome, Some(e)).await
            }
        }
    }

    async fn create<S>(&self, kind: ResourceKind, spec: &S, validation: Result<()>) -> CommandResult
    where
        S: Serialize + Sync,
    {
        if let Err(e) = validation {
            return self.finish(create_failed(kind, &e), Some(e)).await;
        }

        let handle = match self.client.create(kind, spec).await {
            Ok(handle) => handle,
            Err(e) => return self.finish(create_failed(kind, &e), Some(e)).await,
        };

        if !kind.descriptor().async_provisioning {
            let outcome = Outcome::Create(ProvisioningOutcome {
                kind,
                id: handle.id,
                endpoints: handle.endpoints,
                failure: None,
            });
            return self.finish(outcome, None).await;
        }

        let probe = ClientProbe::new(&self.client, kind);
        let polled = self.poller.wait_until_ready(&probe, &handle.id).await;

        let mut endpoints = handle.endpoints;
        endpoints.overlay(polled.endpoints());

        let id = handle.id;
        let (failure, error) = match polled.state {
            PollState::Succeeded => (None, None),
            PollState::FailedTerminal { status } => (
                Some(FailureReason::TerminalStatus {
                    status: status.clone(),
                }),
                Some(ProvisionError::Failed {
                    id: id.clone(),
                    status,
                }),
            ),
            PollState::TimedOut => (
                Some(FailureReason::TimedOut {
                    attempts: polled.attempts,
                }),
                Some(ProvisionError::Timeout {
                    id: id.clone(),
                    attempts: polled.attempts,
                }),
            ),
            PollState::Cancelled => (
                Some(FailureReason::Cancelled),
                Some(ProvisionError::Cancelled { id: id.clone() }),
            ),
        };

        let outcome = Outcome::Create(ProvisioningOutcome {
            kind,
            id,
            endpoints,
            failure,
        });
        self.finish(outcome, error.map(DeployError::from)).await
    }

    async fn finish(&self, outcome: Outcome, error: Option<DeployError>) -> CommandResult {
        self.reporter.report(&outcome).await;

        if let Some(e) = &error {
            error!("{e}");
        }

        CommandResult { outcome, error }
    }
}

fn create_failed(kind: ResourceKind, error: &DeployError) -> Outcome {
    Outcome::create_failed(kind, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::ApiError;
    use crate::report::ResultArtifact;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        server: MockServer,
        deployer: Deployer,
        result_path: PathBuf,
        _temp: TempDir,
    }

    impl Harness {
        async fn start(max_attempts: u32) -> Self {
            let server = MockServer::start().await;
            let temp = TempDir::new().expect("temp dir");
            let result_path = temp.path().join("result");

            let config = ClientConfig::new(Credentials::from_keys("AKID", "secret"))
                .with_base_url(format!("{}/api", server.uri()))
                .with_result_path(&result_path);
            let deployer = Deployer::new(
                &config,
                PollPolicy::immediate(max_attempts),
                CancellationToken::new(),
            )
            .expect("deployer");

            Self {
                server,
                deployer,
                result_path,
                _temp: temp,
            }
        }

        fn artifact(&self) -> ResultArtifact {
            let content = std::fs::read_to_string(&self.result_path).expect("result file");
            ResultArtifact::parse(&content)
        }

        async fn mount_gpu_create(&self, uuid: &str) {
            Mock::given(method("POST"))
                .and(path("/api/gpu"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uuid": uuid })))
                .expect(1)
                .mount(&self.server)
                .await;
        }
    }

    fn gpu_status(status: &str, host: &str, port: u16) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "gpu-1",
            "actual_status": status,
            "ssh_host": host,
            "ssh_port": port
        }))
    }

    fn cpu_config() -> DeploymentConfig {
        DeploymentConfig {
            region: String::from("USA"),
            image: String::from("ubuntu:22.04"),
            cpu: 2,
            ram: 4,
            hdd: 40,
            hdd_type: String::from("ssd"),
            ipv4: true,
            ssh_key: String::from("ssh-ed25519 AAAA"),
            ssh_key_name: String::from("ci"),
            host_name: String::from("worker-1"),
            network_uuid: None,
        }
    }

    #[tokio::test]
    async fn test_gpu_create_reports_third_check() {
        let harness = Harness::start(100).await;
        harness.mount_gpu_create("gpu-1").await;

        Mock::given(method("GET"))
            .and(path("/api/gpu/gpu-1"))
            .respond_with(gpu_status("starting", "pending-host", 1))
            .up_to_n_times(2)
            .expect(2)
            .mount(&harness.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/gpu/gpu-1"))
            .respond_with(gpu_status("running", "ssh.example.com", 40022))
            .expect(1)
            .mount(&harness.server)
            .await;

        let result = harness
            .deployer
            .create_gpu(&GpuConfig::new("RTX_2080", "ssh-ed25519 AAAA"))
            .await;
        assert!(result.is_success());

        let artifact = harness.artifact();
        assert_eq!(artifact.get("uuid"), Some("gpu-1"));
        assert_eq!(artifact.get("host"), Some("ssh.example.com"));
        assert_eq!(artifact.get("port"), Some("40022"));
    }

    #[tokio::test]
    async fn test_gpu_create_times_out_with_partial_result() {
        let harness = Harness::start(100).await;
        harness.mount_gpu_create("gpu-1").await;

        Mock::given(method("GET"))
            .and(path("/api/gpu/gpu-1"))
            .respond_with(gpu_status("starting", "", 0))
            .expect(100)
            .mount(&harness.server)
            .await;

        let result = harness
            .deployer
            .create_gpu(&GpuConfig::new("RTX_2080", "ssh-ed25519 AAAA"))
            .await;

        assert!(matches!(
            result.error,
            Some(DeployError::Provision(ProvisionError::Timeout { attempts: 100, .. }))
        ));
        assert_eq!(
            std::fs::read_to_string(&harness.result_path).expect("result"),
            "uuid=gpu-1\nhost=\nport=0\n"
        );
    }

    #[tokio::test]
    async fn test_gpu_create_destroying_is_failure() {
        let harness = Harness::start(100).await;
        harness.mount_gpu_create("gpu-1").await;

        Mock::given(method("GET"))
            .and(path("/api/gpu/gpu-1"))
            .respond_with(gpu_status("Destroying", "ssh.example.com", 40022))
            .expect(1)
            .mount(&harness.server)
            .await;

        let result = harness
            .deployer
            .create_gpu(&GpuConfig::new("RTX_2080", "ssh-ed25519 AAAA"))
            .await;

        assert!(matches!(
            result.error,
            Some(DeployError::Provision(ProvisionError::Failed { .. }))
        ));
        let artifact = harness.artifact();
        assert_eq!(artifact.get("uuid"), Some("gpu-1"));
        assert_eq!(artifact.get("host"), Some("ssh.example.com"));
    }

    #[tokio::test]
    async fn test_gpu_create_failure_still_reports() {
        let harness = Harness::start(100).await;

        Mock::given(method("POST"))
            .and(path("/api/gpu"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&harness.server)
            .await;

        let result = harness
            .deployer
            .create_gpu(&GpuConfig::new("RTX_2080", "ssh-ed25519 AAAA"))
            .await;

        assert_eq!(result.error.as_ref().and_then(DeployError::status_code), Some(500));
        assert_eq!(
            std::fs::read_to_string(&harness.result_path).expect("result"),
            "uuid=\nhost=\nport=0\n"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_never_calls_api() {
        let harness = Harness::start(100).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&harness.server)
            .await;

        let result = harness
            .deployer
            .create_gpu(&GpuConfig::new("RTX_2080", "key").with_count(0))
            .await;

        assert!(matches!(result.error, Some(DeployError::Config(_))));
        assert!(harness.result_path.exists());
    }

    #[tokio::test]
    async fn test_cpu_create_skips_polling() {
        let harness = Harness::start(100).await;

        Mock::given(method("POST"))
            .and(path("/api/deployment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "dep-1",
                "data": { "ip": "1.2.3.4", "ipv6": "2001:db8::1", "ygg": "200::1" }
            })))
            .expect(1)
            .mount(&harness.server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&harness.server)
            .await;

        let result = harness.deployer.create_cpu(&cpu_config()).await;
        assert!(result.is_success());

        assert_eq!(
            std::fs::read_to_string(&harness.result_path).expect("result"),
            "id=dep-1\nip=1.2.3.4\nipv6=2001:db8::1\nygg=200::1\n"
        );
    }

    #[tokio::test]
    async fn test_delete_existing_gpu() {
        let harness = Harness::start(100).await;

        Mock::given(method("DELETE"))
            .and(path("/api/gpu/gpu-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&harness.server)
            .await;

        let result = harness.deployer.delete(ResourceKind::Gpu, "gpu-1").await;
        assert!(result.is_success());
        assert_eq!(harness.artifact().get("success"), Some("true"));
    }

    #[tokio::test]
    async fn test_delete_missing_gpu_reports_failure() {
        let harness = Harness::start(100).await;

        Mock::given(method("DELETE"))
            .and(path("/api/gpu/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&harness.server)
            .await;

        let result = harness.deployer.delete(ResourceKind::Gpu, "nope").await;

        assert!(matches!(
            result.error,
            Some(DeployError::Api(ApiError::Status { status: 404, .. }))
        ));
        assert_eq!(
            std::fs::read_to_string(&harness.result_path).expect("result"),
            "success=false\n"
        );
        assert!(result.into_result().is_err());
    }

    #[tokio::test]
    async fn test_delete_cpu_server_error() {
        let harness = Harness::start(100).await;

        Mock::given(method("DELETE"))
            .and(path("/api/deployment/dep-1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&harness.server)
            .await;

        let result = harness.deployer.delete(ResourceKind::Cpu, "dep-1").await;

        assert!(!result.is_success());
        assert_eq!(harness.artifact().get("success"), Some("false"));
    }

    #[test]
    fn test_zero_attempt_budget_rejected() {
        let config = ClientConfig::new(Credentials::anonymous());
        let result = Deployer::new(&config, PollPolicy::immediate(0), CancellationToken::new());

        assert!(matches!(result, Err(DeployError::Config(_))));
    }
}

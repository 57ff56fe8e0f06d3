//! Provisioning poll for resources that are created asynchronously.
//!
//! After a successful create the poller waits a warm-up delay, then checks
//! the resource status at a fixed interval until it is running, reaches a
//! terminal failure status, or the attempt budget runs out. Every wait races
//! the cancellation token.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::error::Result;

use super::client::DwsClient;
use super::resource::ResourceKind;
use super::types::{Endpoints, StatusSnapshot};

/// Source of status observations for a single resource.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Fetches the current status of the resource.
    async fn probe(&self, id: &str) -> Result<StatusSnapshot>;
}

/// Probes a resource of a given kind through the API client.
#[derive(Debug, Clone, Copy)]
pub struct ClientProbe<'a> {
    client: &'a DwsClient,
    kind: ResourceKind,
}

impl<'a> ClientProbe<'a> {
    /// Creates a probe for resources of `kind`.
    #[must_use]
    pub const fn new(client: &'a DwsClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl StatusProbe for ClientProbe<'_> {
    async fn probe(&self, id: &str) -> Result<StatusSnapshot> {
        self.client.get(self.kind, id).await
    }
}

/// Server-reported provisioning status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStatus {
    /// The resource is usable.
    Running,
    /// The resource is being torn down.
    Destroying,
    /// The resource stopped.
    Exited,
    /// Any other status; provisioning is still in progress.
    InProgress(String),
}

impl ProvisioningStatus {
    /// Classifies a raw status string, ignoring case and surrounding space.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "running" => Self::Running,
            "destroying" => Self::Destroying,
            "exited" => Self::Exited,
            _ => Self::InProgress(normalized),
        }
    }

    /// Whether polling must stop at this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Destroying => write!(f, "destroying"),
            Self::Exited => write!(f, "exited"),
            Self::InProgress(status) if status.is_empty() => write!(f, "unknown"),
            Self::InProgress(status) => write!(f, "{status}"),
        }
    }
}

/// Terminal state of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// The resource reported `running`.
    Succeeded,
    /// The resource reported a terminal failure status.
    FailedTerminal {
        /// The reported status.
        status: String,
    },
    /// The attempt budget was exhausted.
    TimedOut,
    /// The cancellation token fired.
    Cancelled,
}

/// Result of a poll: terminal state plus the last good observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Terminal state reached.
    pub state: PollState,
    /// Last successful status observation, if any.
    pub last_snapshot: Option<StatusSnapshot>,
    /// Number of status checks performed.
    pub attempts: u32,
}

impl PollOutcome {
    /// Connection data of the last successful observation.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        self.last_snapshot
            .as_ref()
            .map(|s| s.endpoints.clone())
            .unwrap_or_default()
    }

    const fn finish(state: PollState, last_snapshot: Option<StatusSnapshot>, attempts: u32) -> Self {
        Self {
            state,
            last_snapshot,
            attempts,
        }
    }
}

/// Drives the create → poll → terminal state sequence.
#[derive(Debug, Clone)]
pub struct ProvisioningPoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl ProvisioningPoller {
    /// Creates a poller.
    #[must_use]
    pub const fn new(policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    /// Polls `id` until it reaches a terminal state.
    ///
    /// Errors from the probe do not end the poll, except cancellation.
    pub async fn wait_until_ready(&self, probe: &dyn StatusProbe, id: &str) -> PollOutcome {
        let max_attempts = self.policy.max_attempts;

        info!(
            "Waiting {:?} before checking status of {id}",
            self.policy.warmup
        );
        if !self.pause(self.policy.warmup).await {
            info!("Provisioning poll for {id} cancelled during warm-up");
            return PollOutcome::finish(PollState::Cancelled, None, 0);
        }

        let mut last_snapshot = None;

        for attempt in 1..=max_attempts {
            match probe.probe(id).await {
                Ok(snapshot) => {
                    let status = ProvisioningStatus::parse(&snapshot.status);
                    last_snapshot = Some(snapshot);

                    match status {
                        ProvisioningStatus::Running => {
                            info!("Resource {id} is running after {attempt} checks");
                            return PollOutcome::finish(PollState::Succeeded, last_snapshot, attempt);
                        }
                        ProvisioningStatus::Destroying | ProvisioningStatus::Exited => {
                            warn!("Resource {id} reached terminal status {status}");
                            return PollOutcome::finish(
                                PollState::FailedTerminal {
                                    status: status.to_string(),
                                },
                                last_snapshot,
                                attempt,
                            );
                        }
                        ProvisioningStatus::InProgress(_) => {
                            debug!("Resource {id} status: {status} ({attempt}/{max_attempts})");
                        }
                    }
                }
                Err(e) if e.is_cancelled() => {
                    info!("Provisioning poll for {id} cancelled");
                    return PollOutcome::finish(PollState::Cancelled, last_snapshot, attempt);
                }
                Err(e) if e.is_retryable() => {
                    debug!("Status check {attempt}/{max_attempts} for {id} failed: {e}");
                }
                Err(e) => {
                    warn!("Status check {attempt}/{max_attempts} for {id} failed: {e}");
                }
            }

            if attempt < max_attempts && !self.pause(self.policy.interval).await {
                info!("Provisioning poll for {id} cancelled");
                return PollOutcome::finish(PollState::Cancelled, last_snapshot, attempt);
            }
        }

        warn!("Resource {id} not running after {max_attempts} checks");
        PollOutcome::finish(PollState::TimedOut, last_snapshot, max_attempts)
    }

    /// Sleeps for `duration` unless cancelled first. Returns false on cancel.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, DeployError};
    use mockall::Sequence;

    fn snapshot(status: &str) -> StatusSnapshot {
        StatusSnapshot {
            status: status.to_string(),
            endpoints: Endpoints {
                ssh_host: Some(format!("host-{status}")),
                ssh_port: Some(2200),
                ..Endpoints::default()
            },
        }
    }

    fn scripted(statuses: &[&'static str]) -> MockStatusProbe {
        let mut probe = MockStatusProbe::new();
        let mut seq = Sequence::new();
        for status in statuses {
            let status = *status;
            probe
                .expect_probe()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(snapshot(status)));
        }
        probe
    }

    fn poller(max_attempts: u32) -> ProvisioningPoller {
        ProvisioningPoller::new(PollPolicy::immediate(max_attempts), CancellationToken::new())
    }

    #[test]
    fn test_status_classification_ignores_case() {
        assert_eq!(ProvisioningStatus::parse("RUNNING"), ProvisioningStatus::Running);
        assert_eq!(ProvisioningStatus::parse(" Exited "), ProvisioningStatus::Exited);
        assert_eq!(ProvisioningStatus::parse("Destroying"), ProvisioningStatus::Destroying);
        assert_eq!(
            ProvisioningStatus::parse("Starting"),
            ProvisioningStatus::InProgress(String::from("starting"))
        );
        assert!(!ProvisioningStatus::parse("").is_terminal());
        assert!(ProvisioningStatus::parse("running").is_terminal());
        assert_eq!(ProvisioningStatus::parse("").to_string(), "unknown");
    }

    #[tokio::test]
    async fn test_stops_at_running() {
        let probe = scripted(&["starting", "starting", "running"]);
        let outcome = poller(100).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(outcome.state, PollState::Succeeded);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.endpoints().ssh_host.as_deref(), Some("host-running"));
    }

    #[tokio::test]
    async fn test_running_on_last_allowed_attempt() {
        let probe = scripted(&["pending", "starting", "Running"]);
        let outcome = poller(3).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(outcome.state, PollState::Succeeded);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_destroying_fails_after_one_check() {
        let probe = scripted(&["destroying"]);
        let outcome = poller(100).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(
            outcome.state,
            PollState::FailedTerminal {
                status: String::from("destroying")
            }
        );
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.last_snapshot.is_some());
    }

    #[tokio::test]
    async fn test_exited_is_terminal_failure() {
        let probe = scripted(&["starting", "EXITED"]);
        let outcome = poller(100).wait_until_ready(&probe, "gpu-1").await;

        assert!(matches!(outcome.state, PollState::FailedTerminal { .. }));
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_times_out_after_budget() {
        let mut probe = MockStatusProbe::new();
        probe
            .expect_probe()
            .times(100)
            .returning(|_| Ok(snapshot("starting")));

        let outcome = poller(100).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(outcome.state, PollState::TimedOut);
        assert_eq!(outcome.attempts, 100);
    }

    #[tokio::test]
    async fn test_errors_do_not_abort_poll() {
        let mut probe = MockStatusProbe::new();
        let mut seq = Sequence::new();
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DeployError::from(ApiError::status(503, "busy"))));
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(DeployError::from(ApiError::Decode {
                    message: String::from("expected value"),
                    body: String::from("garbage"),
                }))
            });
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(snapshot("running")));

        let outcome = poller(10).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(outcome.state, PollState::Succeeded);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_timeout_without_any_good_response_has_no_endpoints() {
        let mut probe = MockStatusProbe::new();
        probe
            .expect_probe()
            .times(5)
            .returning(|_| Err(DeployError::from(ApiError::status(500, ""))));

        let outcome = poller(5).wait_until_ready(&probe, "gpu-1").await;

        assert_eq!(outcome.state, PollState::TimedOut);
        assert!(outcome.last_snapshot.is_none());
        assert!(outcome.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_warmup_ends() {
        let mut probe = MockStatusProbe::new();
        probe.expect_probe().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let poller = ProvisioningPoller::new(PollPolicy::default(), cancel);

        let outcome = poller.wait_until_ready(&probe, "gpu-1").await;
        assert_eq!(outcome.state, PollState::Cancelled);
        assert_eq!(outcome.attempts, 0);
    }

    #[tokio::test]
    async fn test_cancel_preempts_interval_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut probe = MockStatusProbe::new();
        probe.expect_probe().times(1).returning(move |_| {
            trigger.cancel();
            Ok(snapshot("starting"))
        });

        let policy = PollPolicy {
            warmup: Duration::ZERO,
            interval: Duration::from_secs(3600),
            max_attempts: 100,
        };
        let outcome = ProvisioningPoller::new(policy, cancel)
            .wait_until_ready(&probe, "gpu-1")
            .await;

        assert_eq!(outcome.state, PollState::Cancelled);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.endpoints().ssh_host.as_deref(), Some("host-starting"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_warmup_and_intervals() {
        let probe = scripted(&["starting", "starting", "running"]);
        let policy = PollPolicy {
            warmup: Duration::from_secs(30),
            interval: Duration::from_secs(10),
            max_attempts: 100,
        };

        let started = tokio::time::Instant::now();
        let outcome = ProvisioningPoller::new(policy, CancellationToken::new())
            .wait_until_ready(&probe, "gpu-1")
            .await;

        assert_eq!(outcome.state, PollState::Succeeded);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(50));
        assert!(elapsed < Duration::from_secs(51));
    }
}

//! Signed HTTP client for the provider API.
//!
//! Every call is built against `base_url + resource path`, signed with the
//! configured credentials, raced against the cancellation token, and
//! classified into transport, status or decode failures.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, DeploymentConfig, GpuConfig};
use crate::error::{ApiError, DeployError, Result};

use super::resource::ResourceKind;
use super::signer::RequestSigner;
use super::types::{
    CreatedHandle, DeploymentResponse, GpuCreateResponse, RentedGpuInfo, StatusSnapshot,
};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Provider API client.
#[derive(Debug, Clone)]
pub struct DwsClient {
    /// HTTP client.
    client: Client,
    /// Request signer.
    signer: RequestSigner,
    /// Base URL including the routed prefix, without trailing slash.
    base_url: String,
    /// Aborts in-flight calls when cancelled.
    cancel: CancellationToken,
}

impl DwsClient {
    /// Creates a new client from the shared configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.normalized_base_url()?;
        let timeout = config
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployError::internal(format!("Failed to create HTTP client: {e}")))?;

        if config.credentials.is_anonymous() {
            warn!("No access key/secret configured, signing requests anonymously");
        }

        debug!("API client for {base_url} with timeout {timeout:?}");

        Ok(Self {
            client,
            signer: RequestSigner::new(config.credentials.clone()),
            base_url,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a cancellation token that aborts in-flight calls.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Creates a resource of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response cannot be decoded.
    pub async fn create<S>(&self, kind: ResourceKind, spec: &S) -> Result<CreatedHandle>
    where
        S: Serialize + Sync,
    {
        let body = serde_json::to_vec(spec).map_err(|e| ApiError::Encode {
            message: e.to_string(),
        })?;

        let url = kind.collection_url(&self.base_url)?;
        let response = self.execute(Method::POST, url, Some(body)).await?;

        let handle: CreatedHandle = match kind {
            ResourceKind::Gpu => decode::<GpuCreateResponse>(&response)?.into(),
            ResourceKind::Cpu => decode::<DeploymentResponse>(&response)?.into(),
        };

        info!("Created {kind} resource: {}", handle.id);
        Ok(handle)
    }

    /// Fetches the current status of a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response cannot be decoded.
    pub async fn get(&self, kind: ResourceKind, id: &str) -> Result<StatusSnapshot> {
        debug!("Get {kind} by id: {id}");

        let url = kind.item_url(&self.base_url, id)?;
        let response = self.execute(Method::GET, url, None).await?;

        let snapshot: StatusSnapshot = match kind {
            ResourceKind::Gpu => decode::<RentedGpuInfo>(&response)?.into(),
            ResourceKind::Cpu => decode::<DeploymentResponse>(&response)?.into(),
        };

        Ok(snapshot)
    }

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        debug!("Delete {kind} by id: {id}");

        let url = kind.item_url(&self.base_url, id)?;
        self.execute(Method::DELETE, url, None).await?;

        info!("Deleted {kind} resource: {id}");
        Ok(())
    }

    /// Creates a GPU instance.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::create`].
    pub async fn create_gpu(&self, config: &GpuConfig) -> Result<CreatedHandle> {
        self.create(ResourceKind::Gpu, config).await
    }

    /// Fetches the status of a GPU instance.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::get`].
    pub async fn get_gpu(&self, id: &str) -> Result<StatusSnapshot> {
        self.get(ResourceKind::Gpu, id).await
    }

    /// Deletes a GPU instance.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::delete`].
    pub async fn delete_gpu(&self, id: &str) -> Result<()> {
        self.delete(ResourceKind::Gpu, id).await
    }

    /// Creates a CPU deployment.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::create`].
    pub async fn create_cpu(&self, config: &DeploymentConfig) -> Result<CreatedHandle> {
        self.create(ResourceKind::Cpu, config).await
    }

    /// Fetches the status of a CPU deployment.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::get`].
    pub async fn get_cpu(&self, id: &str) -> Result<StatusSnapshot> {
        self.get(ResourceKind::Cpu, id).await
    }

    /// Deletes a CPU deployment.
    ///
    /// # Errors
    ///
    /// See [`DwsClient::delete`].
    pub async fn delete_cpu(&self, id: &str) -> Result<()> {
        self.delete(ResourceKind::Cpu, id).await
    }

    /// Builds, signs and executes a single request, returning the raw body.
    async fn execute(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<String> {
        let endpoint = format!("{method} {url}");

        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let mut request = builder.build().map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        trace!("Signing request {endpoint}");
        self.signer.sign(&mut request)?;

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                return Err(ApiError::Cancelled { endpoint }.into());
            }
            result = self.client.execute(request) => result.map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?,
        };

        let status = response.status();

        let text = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                return Err(ApiError::Cancelled { endpoint }.into());
            }
            result = response.text() => result.map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?,
        };

        debug!("{endpoint} -> {status}");
        trace!("Response body: {text}");

        check_status(status.as_u16(), text)
    }
}

/// Maps an error-range status to a status error.
fn check_status(status: u16, body: String) -> Result<String> {
    if (400..=599).contains(&status) {
        return Err(ApiError::status(status, body).into());
    }
    Ok(body)
}

/// Decodes a JSON body, keeping the raw text on failure.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        ApiError::Decode {
            message: e.to_string(),
            body: body.to_string(),
        }
        .into()
    })
}

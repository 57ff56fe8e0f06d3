//! Provider API integration module.
//!
//! This module provides the signed HTTP client, resource descriptors, and
//! the provisioning poll for asynchronously created resources.

mod client;
mod poller;
mod resource;
mod signer;
mod types;

pub use client::{DwsClient, DEFAULT_TIMEOUT_SECS};
pub use poller::{
    ClientProbe, PollOutcome, PollState, ProvisioningPoller, ProvisioningStatus, StatusProbe,
};
pub use resource::{ResourceDescriptor, ResourceKind};
pub use signer::{RequestSigner, SigningScope, DEFAULT_REGION, DEFAULT_SERVICE, ROUTED_PREFIX};
pub use types::{
    CreatedHandle, DeploymentData, DeploymentResponse, Endpoints, GpuCreateResponse,
    RentedGpuInfo, StatusSnapshot,
};

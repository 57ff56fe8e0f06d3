//! Provider API types and data structures.
//!
//! Wire types mirror the provider's JSON bodies; the normalized types
//! (`CreatedHandle`, `StatusSnapshot`, `Endpoints`) are what the rest of the
//! crate works with regardless of resource kind.

use serde::{Deserialize, Serialize};

/// Response to a GPU create call.
#[derive(Debug, Clone, Deserialize)]
pub struct GpuCreateResponse {
    /// Identifier of the rented GPU.
    #[serde(alias = "id")]
    pub uuid: String,
}

/// Rented GPU information returned by a GPU get call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RentedGpuInfo {
    /// Identifier of the rented GPU.
    #[serde(alias = "id")]
    pub uuid: String,
    /// Status reported by the host, e.g. `starting` or `running`.
    #[serde(alias = "actualStatus")]
    pub actual_status: String,
    /// SSH host of the instance.
    #[serde(alias = "sshHost")]
    pub ssh_host: String,
    /// SSH port of the instance.
    #[serde(alias = "sshPort")]
    pub ssh_port: u16,
}

/// Network data of a CPU deployment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentData {
    /// Public IPv4 address.
    pub ip: String,
    /// Public IPv6 address.
    pub ipv6: String,
    /// Overlay network address.
    pub ygg: String,
}

/// Response to a CPU create or get call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentResponse {
    /// Identifier of the deployment.
    #[serde(alias = "uuid")]
    pub id: String,
    /// Deployment status, when the server reports one.
    pub status: Option<String>,
    /// Network data, once assigned.
    pub data: Option<DeploymentData>,
    /// Lease end as a Unix timestamp.
    #[serde(alias = "end_time")]
    pub end_time: Option<i64>,
}

/// Connection details of a resource. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// Public IPv4 address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Public IPv6 address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    /// Overlay network address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ygg: Option<String>,
    /// SSH host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_host: Option<String>,
    /// SSH port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,
}

impl Endpoints {
    /// Returns true if no connection detail is known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ip.is_none()
            && self.ipv6.is_none()
            && self.ygg.is_none()
            && self.ssh_host.is_none()
            && self.ssh_port.is_none()
    }

    /// Replaces every field that `newer` knows about.
    pub fn overlay(&mut self, newer: Self) {
        if newer.ip.is_some() {
            self.ip = newer.ip;
        }
        if newer.ipv6.is_some() {
            self.ipv6 = newer.ipv6;
        }
        if newer.ygg.is_some() {
            self.ygg = newer.ygg;
        }
        if newer.ssh_host.is_some() {
            self.ssh_host = newer.ssh_host;
        }
        if newer.ssh_port.is_some() {
            self.ssh_port = newer.ssh_port;
        }
    }
}

/// Identifier and initial connection data of a freshly created resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedHandle {
    /// Resource identifier.
    pub id: String,
    /// Connection data returned with the create call, if any.
    pub endpoints: Endpoints,
}

/// One status observation of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Raw status string as reported by the server.
    pub status: String,
    /// Connection data known at this observation.
    pub endpoints: Endpoints,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

impl From<GpuCreateResponse> for CreatedHandle {
    fn from(response: GpuCreateResponse) -> Self {
        Self {
            id: response.uuid,
            endpoints: Endpoints::default(),
        }
    }
}

impl From<RentedGpuInfo> for StatusSnapshot {
    fn from(info: RentedGpuInfo) -> Self {
        Self {
            status: info.actual_status,
            endpoints: Endpoints {
                ssh_host: non_empty(info.ssh_host),
                ssh_port: (info.ssh_port != 0).then_some(info.ssh_port),
                ..Endpoints::default()
            },
        }
    }
}

impl From<DeploymentData> for Endpoints {
    fn from(data: DeploymentData) -> Self {
        Self {
            ip: non_empty(data.ip),
            ipv6: non_empty(data.ipv6),
            ygg: non_empty(data.ygg),
            ..Self::default()
        }
    }
}

impl From<DeploymentResponse> for CreatedHandle {
    fn from(response: DeploymentResponse) -> Self {
        Self {
            id: response.id,
            endpoints: response.data.map(Endpoints::from).unwrap_or_default(),
        }
    }
}

impl From<DeploymentResponse> for StatusSnapshot {
    fn from(response: DeploymentResponse) -> Self {
        Self {
            status: response.status.unwrap_or_default(),
            endpoints: response.data.map(Endpoints::from).unwrap_or_default(),
        }
    }
}

//! Desired resource shapes.
//!
//! These structs are built once from command-line flags and serialized
//! verbatim as the JSON body of a create request.

use serde::{Deserialize, Serialize};

/// Default image for new instances.
pub const DEFAULT_IMAGE: &str = "ubuntu:latest";

/// Default region for new GPU instances.
pub const DEFAULT_GPU_REGION: &str = "Europe";

/// Desired shape of a GPU instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuConfig {
    /// GPU model name, e.g. `RTX_2080`.
    pub gpu_name: String,
    /// Image to deploy, as `image:version`.
    pub image: String,
    /// Public SSH key installed on the instance.
    pub ssh_key: String,
    /// Number of GPUs to attach.
    pub gpu_count: u32,
    /// Region to deploy into.
    pub region: String,
}

impl GpuConfig {
    /// Creates a GPU config with default image, count and region.
    #[must_use]
    pub fn new(gpu_name: impl Into<String>, ssh_key: impl Into<String>) -> Self {
        Self {
            gpu_name: gpu_name.into(),
            image: String::from(DEFAULT_IMAGE),
            ssh_key: ssh_key.into(),
            gpu_count: 1,
            region: String::from(DEFAULT_GPU_REGION),
        }
    }

    /// Sets the image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the GPU count.
    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.gpu_count = count;
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// Desired shape of a CPU virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Region to deploy into.
    pub region: String,
    /// Image to deploy, as `image:version`.
    #[serde(rename = "imageVersion")]
    pub image: String,
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory in GB.
    pub ram: u32,
    /// Disk size in GB.
    pub hdd: u32,
    /// Disk type, e.g. `hdd` or `ssd`.
    pub hdd_type: String,
    /// Whether to allocate a public IPv4 address.
    pub ipv4: bool,
    /// Public SSH key installed on the machine.
    pub ssh_key: String,
    /// Name under which the SSH key is stored.
    pub ssh_key_name: String,
    /// Host name of the machine.
    pub host_name: String,
    /// Private network to attach to.
    #[serde(rename = "networkUUID", skip_serializing_if = "Option::is_none")]
    pub network_uuid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_config_wire_format() {
        let config = GpuConfig::new("RTX_2080", "ssh-ed25519 AAAA").with_count(2);
        let json = serde_json::to_value(&config).expect("serialize");

        assert_eq!(json["gpuName"], "RTX_2080");
        assert_eq!(json["gpuCount"], 2);
        assert_eq!(json["image"], DEFAULT_IMAGE);
        assert_eq!(json["region"], DEFAULT_GPU_REGION);
        assert_eq!(json["sshKey"], "ssh-ed25519 AAAA");
    }

    #[test]
    fn test_deployment_config_omits_missing_network() {
        let config = DeploymentConfig {
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
        };
        let json = serde_json::to_value(&config).expect("serialize");

        assert_eq!(json["imageVersion"], "ubuntu:22.04");
        assert_eq!(json["hddType"], "ssd");
        assert!(json.get("networkUUID").is_none());
    }
}

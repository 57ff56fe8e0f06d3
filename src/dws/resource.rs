//! Resource kind descriptors.

use std::fmt;

use reqwest::Url;
use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Kind of compute resource managed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Rented GPU instance.
    Gpu,
    /// CPU virtual machine.
    Cpu,
}

/// Static description of how a resource kind is addressed and provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// The described kind.
    pub kind: ResourceKind,
    /// API path relative to the base URL.
    pub path: &'static str,
    /// Whether creation completes asynchronously and must be polled.
    pub async_provisioning: bool,
}

const GPU: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Gpu,
    path: "/gpu",
    async_provisioning: true,
};

const CPU: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Cpu,
    path: "/deployment",
    async_provisioning: false,
};

impl ResourceKind {
    /// Returns the descriptor of this kind.
    #[must_use]
    pub const fn descriptor(self) -> &'static ResourceDescriptor {
        match self {
            Self::Gpu => &GPU,
            Self::Cpu => &CPU,
        }
    }

    /// Collection URL of this kind under the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not a valid URL.
    pub fn collection_url(self, base_url: &str) -> Result<Url> {
        let url = format!("{base_url}{}", self.descriptor().path);
        Url::parse(&url).map_err(|e| {
            ConfigError::InvalidUrl {
                url,
                message: e.to_string(),
            }
            .into()
        })
    }

    /// URL of a single resource of this kind.
    ///
    /// The id is appended as one percent-encoded path segment, so `/`, `?`
    /// and `#` inside it cannot change the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or a dot segment, or if the base
    /// URL cannot carry path segments.
    pub fn item_url(self, base_url: &str, id: &str) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(ConfigError::validation(
                format!("invalid {self} id '{id}'"),
                "id",
            )
            .into());
        }

        let mut url = self.collection_url(base_url)?;
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidUrl {
                url: base_url.to_string(),
                message: String::from("URL cannot be a base"),
            })?
            .push(id);
        Ok(url)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "GPU"),
            Self::Cpu => write!(f, "CPU"),
        }
    }
}

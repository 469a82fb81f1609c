use std::str::FromStr;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Well-known link-local address where ECS exposes per-task metadata.
const TASK_METADATA_V2_URL: &str = "http://169.254.170.2/v2/metadata";
/// Path under the server's own public directory where the development fixture lives.
const LOCAL_FIXTURE_PATH: &str = "/js/metadata.json";

/// Image-name substring identifying the proxy sidecar. The first container in
/// the task whose image does not contain it is treated as the application
/// container.
pub const SIDECAR_IMAGE_MARKER: &str = "tinyproxy";

/// Describes where the metadata document is fetched from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum MetadataEndpoint {
    /// The fixed link-local task metadata endpoint.
    #[default]
    TaskV2,
    /// A fixture served out of this process's own public directory.
    LocalFixture { port: u16 },
    /// An explicit URL, used for overrides and tests.
    Custom(String),
}

impl MetadataEndpoint {
    /// Returns the full URL this endpoint resolves to.
    pub fn url(&self) -> String {
        match self {
            MetadataEndpoint::TaskV2 => TASK_METADATA_V2_URL.to_owned(),
            MetadataEndpoint::LocalFixture { port } => {
                format!("http://127.0.0.1:{port}{LOCAL_FIXTURE_PATH}")
            }
            MetadataEndpoint::Custom(url) => url.clone(),
        }
    }
}

impl FromStr for MetadataEndpoint {
    type Err = MetadataEndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("task-v2") || value.eq_ignore_ascii_case("v2") {
            return Ok(MetadataEndpoint::TaskV2);
        }

        if let Some(port) = value.strip_prefix("local:") {
            let port = port.parse::<u16>().map_err(|_| {
                MetadataEndpointParseError::InvalidMetadataEndpoint(value.to_owned())
            })?;
            return Ok(MetadataEndpoint::LocalFixture { port });
        }

        if value.starts_with("http://") || value.starts_with("https://") {
            return Ok(MetadataEndpoint::Custom(value.to_owned()));
        }

        Err(MetadataEndpointParseError::InvalidMetadataEndpoint(
            value.to_owned(),
        ))
    }
}

/// Errors encountered while parsing a [`MetadataEndpoint`] from a string.
#[derive(Debug, Error, Clone)]
pub enum MetadataEndpointParseError {
    #[error("invalid metadata endpoint: {0}")]
    InvalidMetadataEndpoint(String),
}

/// Client for the task metadata endpoint.
///
/// One instance is shared across requests; it holds the resolved endpoint and a
/// pooled [`reqwest::Client`]. Every [`MetadataClient::fetch`] performs exactly
/// one GET with no retries and no caching, and no timeout beyond what reqwest
/// applies by default.
///
/// # Errors
/// [`MetadataClient::fetch`] returns [`MetadataError`] when the endpoint is
/// unreachable, responds with a non-success status, or returns a body that is
/// not JSON.
///
/// # Examples
/// ```ignore
/// use taskview_metadata::{ContainerSummary, MetadataClient, MetadataEndpoint};
///
/// # async fn demo() -> Result<(), taskview_metadata::MetadataError> {
/// let client = MetadataClient::new(MetadataEndpoint::TaskV2);
/// let document = client.fetch().await?;
/// let summary = ContainerSummary::from_document(&document)?;
/// println!("{} on {}", summary.image, summary.ipv4_address);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MetadataClient {
    endpoint: MetadataEndpoint,
    http: reqwest::Client,
}

impl MetadataClient {
    /// Creates a client targeting the provided endpoint.
    pub fn new(endpoint: MetadataEndpoint) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    /// Returns the endpoint backing this client.
    pub fn endpoint(&self) -> &MetadataEndpoint {
        &self.endpoint
    }

    /// Fetches the task metadata document.
    ///
    /// # Returns
    /// The decoded JSON document, exactly as the endpoint returned it.
    ///
    /// # Errors
    /// [`MetadataError::Transport`] when the request cannot be sent or the body
    /// cannot be read, [`MetadataError::UpstreamStatus`] when the endpoint
    /// answers with a non-success status, [`MetadataError::InvalidPayload`]
    /// when the body does not parse as JSON.
    pub async fn fetch(&self) -> Result<Value, MetadataError> {
        let response = self.http.get(self.endpoint.url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::UpstreamStatus(status));
        }

        let body = response.text().await?;
        let document = serde_json::from_str(&body)?;
        Ok(document)
    }
}

/// Typed slice of the metadata document. Fields the page never looks at are
/// left in the raw [`Value`] and ignored here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskMetadata {
    #[serde(default)]
    pub containers: Vec<ContainerMetadata>,
}

impl TaskMetadata {
    /// Deserializes the typed view out of a raw metadata document.
    pub fn from_document(document: &Value) -> Result<Self, MetadataError> {
        serde_json::from_value(document.clone()).map_err(MetadataError::InvalidPayload)
    }

    /// Returns the first container whose image is not the proxy sidecar.
    pub fn application_container(&self) -> Option<&ContainerMetadata> {
        self.containers
            .iter()
            .find(|container| !container.image.contains(SIDECAR_IMAGE_MARKER))
    }
}

/// One container entry of the task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerMetadata {
    pub image: String,
    #[serde(default)]
    pub networks: Vec<NetworkMetadata>,
}

/// One network attachment of a container.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkMetadata {
    #[serde(rename = "NetworkMode")]
    pub network_mode: String,
    #[serde(rename = "IPv4Addresses", default)]
    pub ipv4_addresses: Vec<String>,
}

/// The three display fields the status page renders, extracted with explicit
/// presence checks rather than unchecked indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub image: String,
    pub network_mode: String,
    pub ipv4_address: String,
}

impl ContainerSummary {
    /// Selects the application container and pulls its display fields.
    ///
    /// # Errors
    /// [`MetadataError::NoApplicationContainer`] when every container image
    /// carries the sidecar marker, [`MetadataError::MissingNetwork`] and
    /// [`MetadataError::MissingAddress`] when the selected container has no
    /// network attachment or no IPv4 address, [`MetadataError::InvalidPayload`]
    /// when the document does not deserialize into [`TaskMetadata`].
    pub fn from_document(document: &Value) -> Result<Self, MetadataError> {
        let task = TaskMetadata::from_document(document)?;
        let container = task
            .application_container()
            .ok_or(MetadataError::NoApplicationContainer)?;
        let network = container
            .networks
            .first()
            .ok_or_else(|| MetadataError::MissingNetwork {
                image: container.image.clone(),
            })?;
        let address =
            network
                .ipv4_addresses
                .first()
                .ok_or_else(|| MetadataError::MissingAddress {
                    image: container.image.clone(),
                })?;

        Ok(Self {
            image: container.image.clone(),
            network_mode: network.network_mode.clone(),
            ipv4_address: address.clone(),
        })
    }
}

/// Errors emitted while fetching or interpreting the metadata document.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metadata endpoint returned status {0}")]
    UpstreamStatus(StatusCode),
    #[error("metadata document is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("no application container in metadata document")]
    NoApplicationContainer,
    #[error("container {image} reports no networks")]
    MissingNetwork { image: String },
    #[error("container {image} reports no IPv4 addresses")]
    MissingAddress { image: String },
}

impl MetadataError {
    /// Stable short code surfaced alongside the human-readable message in
    /// error responses.
    pub fn code(&self) -> &'static str {
        match self {
            MetadataError::Transport(_) => "upstream_unreachable",
            MetadataError::UpstreamStatus(_) => "upstream_status",
            MetadataError::InvalidPayload(_) => "invalid_payload",
            MetadataError::NoApplicationContainer => "no_application_container",
            MetadataError::MissingNetwork { .. } => "no_network",
            MetadataError::MissingAddress { .. } => "no_ipv4_address",
        }
    }
}

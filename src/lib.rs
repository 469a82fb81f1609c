//! Taskview server crate.
//!
//! Taskview serves a single HTML status page describing the ECS task it runs
//! inside: it fetches the task metadata document, picks the application
//! container (skipping the proxy sidecar), and renders that container's image,
//! network mode, and IPv4 address next to the raw document. Everything else
//! under the public directory is served as-is, which is also how the
//! development fixture reaches the metadata client.

pub mod config;
pub mod error;
pub mod mode;
pub mod pages;
pub mod runtime;

pub use crate::config::{Config, ConfigBuilder, ConfigError};
pub use crate::error::{Result, TaskviewError};
pub use crate::mode::DeploymentMode;
pub use crate::pages::{AppState, PageError};
pub use crate::runtime::{router, run, serve};
pub use taskview_metadata::{
    ContainerMetadata, ContainerSummary, MetadataClient, MetadataEndpoint, MetadataError,
    NetworkMetadata, TaskMetadata,
};

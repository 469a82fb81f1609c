use thiserror::Error;

use crate::config::ConfigError;
use taskview_metadata::MetadataError;

pub type Result<T> = std::result::Result<T, TaskviewError>;

#[derive(Debug, Error)]
pub enum TaskviewError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

use thiserror::Error;

use crate::config::ConfigError;
use crate::render::RenderTickError;
use crate::transport::TransportError;

/// Fatal pipeline failure reported to the caller.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("surface failed: {0}")]
    Surface(#[from] RenderTickError),
}

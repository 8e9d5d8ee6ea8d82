//! Network layer errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    /// The viewport cannot be covered; a configuration or caller error.
    #[error("invalid region: {reason}")]
    InvalidRegion { reason: String },

    /// The provider could not be reached or answered with a failure status.
    #[error("points-of-interest provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The provider answered with something we cannot read.
    #[error("malformed provider response: {reason}")]
    MalformedResponse { reason: String },
}

impl NetError {
    /// Transient boundary failures the caller may retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::MalformedResponse { .. }
        )
    }
}

pub type NetResult<T> = Result<T, NetError>;

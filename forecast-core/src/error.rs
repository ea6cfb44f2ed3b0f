use thiserror::Error;

/// Why the host could not hand out a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("Geolocation is not supported by this host.")]
    CapabilityUnavailable,

    #[error("Access to location was denied.")]
    PermissionDenied,
}

/// Failures of the two provider requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Either endpoint answered with a non-success status.
    #[error("Error fetching weather data.")]
    Provider,

    /// Network, body or JSON failure.
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport(message.into())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Transport(format!("Malformed weather response: {err}"))
    }
}

/// Anything that ends a load attempt in the Error state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

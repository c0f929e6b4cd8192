use crate::ports::outbound::ApiError;

/// Errors surfaced by the sync state objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Joining or loading the room failed at startup.
    #[error("Could not connect to the room: {0}")]
    Init(ApiError),

    #[error("Failed to refresh from the server: {0}")]
    Fetch(ApiError),

    /// A user action was rejected or could not reach the server.
    #[error("{action} failed: {source}")]
    Action {
        action: &'static str,
        source: ApiError,
    },

    /// The request was refused locally without contacting the server.
    #[error("{0}")]
    Rejected(String),
}

impl SyncError {
    pub fn action(action: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| SyncError::Action { action, source }
    }

    /// The underlying transport error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SyncError::Init(e) | SyncError::Fetch(e) | SyncError::Action { source: e, .. } => {
                Some(e)
            }
            SyncError::Rejected(_) => None,
        }
    }
}

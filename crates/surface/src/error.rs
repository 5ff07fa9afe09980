#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    UnknownLayer(String),
    UnknownSource(String),
    UnknownSubscription(u64),
    DuplicateLayer(String),
    DuplicateSource(String),
    DuplicateImage(String),
    /// The engine refused the call for a reason of its own (bad expression,
    /// property not valid for the layer type, style still processing...).
    Rejected { call: &'static str, reason: String },
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::UnknownLayer(id) => write!(f, "layer not found: {id}"),
            SurfaceError::UnknownSource(id) => write!(f, "source not found: {id}"),
            SurfaceError::UnknownSubscription(id) => write!(f, "subscription not found: {id}"),
            SurfaceError::DuplicateLayer(id) => write!(f, "layer already exists: {id}"),
            SurfaceError::DuplicateSource(id) => write!(f, "source already exists: {id}"),
            SurfaceError::DuplicateImage(id) => write!(f, "image already exists: {id}"),
            SurfaceError::Rejected { call, reason } => write!(f, "{call} rejected: {reason}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

use brep_kernel::KernelError;
use brep_outline::OutlineError;

/// Failure to fetch an asset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DownloadError {
    #[error("{path}: status {status}")]
    Status { path: String, status: u16 },

    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
}

impl DownloadError {
    pub fn tag(&self) -> &'static str {
        "download"
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DownloadError::Status { status: 404, .. })
    }
}

/// Errors from the scene layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("hash table {path}: {reason}")]
    HashTable { path: String, reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error("scene worker stopped")]
    WorkerClosed,
}

impl SceneError {
    pub fn tag(&self) -> &'static str {
        match self {
            SceneError::Kernel(e) => e.tag(),
            SceneError::Outline(e) => e.tag(),
            SceneError::Download(e) => e.tag(),
            SceneError::HashTable { .. } => "download",
            SceneError::Serialization { .. } => "parse",
            SceneError::WorkerClosed => "worker",
        }
    }
}

impl From<serde_json::Error> for SceneError {
    fn from(e: serde_json::Error) -> Self {
        SceneError::Serialization {
            reason: e.to_string(),
        }
    }
}

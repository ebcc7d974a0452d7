/// Errors raised by the numeric library contract (allocate, evaluate, release).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    #[error("stale native handle (already disposed or never allocated)")]
    StaleHandle,

    #[error("handle refers to a {actual}, expected a {expected}")]
    WrongResource {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid input buffers: {reason}")]
    InvalidInput { reason: String },

    #[error("native resource table is poisoned")]
    Poisoned,
}

/// Errors raised by the kernel.
///
/// Most "nothing to measure / nothing picked" outcomes are `Ok(None)`; an
/// `Err` means malformed data or a violated call contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("malformed topology: {reason}")]
    Topology { reason: String },

    #[error("contract violation: {reason}")]
    Contract { reason: String },

    #[error("numeric library: {0}")]
    Native(#[from] NativeError),

    #[error("{reason}")]
    Profile { reason: String },

    #[error("failed to parse product data: {reason}")]
    Parse { reason: String },
}

impl KernelError {
    /// Short classification tag, reported next to the message.
    pub fn tag(&self) -> &'static str {
        match self {
            KernelError::IndexOutOfRange { .. } => "index",
            KernelError::Topology { .. } => "topology",
            KernelError::Contract { .. } => "contract",
            KernelError::Native(_) => "native",
            KernelError::Profile { .. } => "profile",
            KernelError::Parse { .. } => "parse",
        }
    }

    pub(crate) fn contract(reason: impl Into<String>) -> Self {
        KernelError::Contract {
            reason: reason.into(),
        }
    }

    pub(crate) fn topology(reason: impl Into<String>) -> Self {
        KernelError::Topology {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(e: serde_json::Error) -> Self {
        KernelError::Parse {
            reason: e.to_string(),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Bounds-checked lookup into one of the product arrays.
pub fn lookup<'a, T>(items: &'a [T], index: usize, kind: &'static str) -> KernelResult<&'a T> {
    items.get(index).ok_or(KernelError::IndexOutOfRange {
        kind,
        index,
        len: items.len(),
    })
}

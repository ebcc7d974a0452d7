use brep_kernel::KernelError;

/// Errors raised while building triangle topology or tracing outlines.
///
/// Seam and normal-sign violations mean the face's triangulation does not
/// agree with its surface; they abort the face instead of producing a
/// partial outline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutlineError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("face {face}: seam vertices {a} and {b} are {delta} apart")]
    SeamMismatch {
        face: usize,
        a: u32,
        b: u32,
        delta: f64,
    },

    #[error("face {face}: the two sides of seam edge {edge} have {left} and {right} vertices")]
    SeamLength {
        face: usize,
        edge: usize,
        left: usize,
        right: usize,
    },

    #[error("face {face}: seam vertices {a} and {b} have opposite normals")]
    SeamNormal { face: usize, a: u32, b: u32 },

    #[error("face {face}: triangle {triangle} winds against its vertex normals")]
    NormalSign { face: usize, triangle: usize },

    #[error("face {face}: {reason}")]
    BadTriangulation { face: usize, reason: String },

    #[error("view transform is singular")]
    SingularView,
}

impl OutlineError {
    pub fn tag(&self) -> &'static str {
        match self {
            OutlineError::Kernel(e) => e.tag(),
            OutlineError::SeamMismatch { .. } | OutlineError::SeamLength { .. } => "seam",
            OutlineError::SeamNormal { .. } | OutlineError::NormalSign { .. } => "normal",
            OutlineError::BadTriangulation { .. } => "triangulation",
            OutlineError::SingularView => "contract",
        }
    }
}

pub type OutlineResult<T> = Result<T, OutlineError>;

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the render boundary. There are no retries anywhere: every
/// variant propagates to the caller, and in the dataset pipeline any of
/// them aborts the whole run.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Nonzero exit status, spawn failure, or wall-clock timeout of the
    /// external renderer process.
    #[error("renderer invocation failed: {0}")]
    RendererFailed(String),

    /// The renderer exited successfully but the declared output file is
    /// missing. Never downgraded to an empty raster; that would silently
    /// corrupt occlusion accounting.
    #[error("renderer produced no output at {}", path.display())]
    OutputMissing { path: PathBuf },

    #[error("failed to decode renderer output")]
    Image(#[from] image::ImageError),

    #[error("filesystem failure")]
    Io(#[from] std::io::Error),
}

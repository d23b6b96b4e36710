use lume_core::FrameError;

/// Errors that fail a single registry request.
///
/// Invalid entries and undecodable frames are not errors: they are dropped
/// without a response.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("storage declined write for {key}")]
    WriteDeclined { key: String },

    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("failed to encode frame: {0}")]
    Frame(#[from] FrameError),
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

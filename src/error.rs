//! Typed error taxonomy for the pipeline (§7 of the spec).
//!
//! These are the fatal, classifiable failures; everything else propagates as
//! `anyhow`. Variants carry just enough context to be surfaced to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source buffer cannot be decoded/addressed as pixels.
    #[error("source is not a supported image")]
    InvalidImage,

    /// A compositing/filter step produced no output; detail surfaced to user.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// Translation collaborator cannot authenticate; fatal to the whole
    /// pipeline until resolved externally, surfaced once.
    #[error("missing translation credential")]
    MissingCredential,

    /// Translation API error carrying provider status/message.
    #[error("translation API error: {0}")]
    TranslationApi(String),
}

//! # rf-glitch-io
//!
//! Everything around the `rf-glitch` core that touches the outside world.
//!
//! - **Ingestion**: CSV dumps, raw interleaved `f32` buffers and WAV files
//!   become a canonical [`rf_glitch::SampleStream`]. Column naming
//!   conventions are resolved once, here, never inside the analyzers.
//! - **Rendering**: text, JSON and CSV views of a [`rf_glitch::Report`].
//! - **CLI**: the `glitchscan` binary ties both together.

pub mod ingest;
pub mod render;

pub use ingest::{load, ChannelResolver, InputFormat, LoadOptions};
pub use render::ReportFormat;

use thiserror::Error;

/// Errors that can occur while loading or writing analysis data
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("No samples in {0}")]
    Empty(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] rf_glitch::GlitchError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

//! # rf-glitch
//!
//! Defect analysis for rendered or recorded audio streams.
//!
//! ## Features
//!
//! - **Discontinuities**: sample-to-sample jumps above an absolute threshold
//! - **Buffer Seams**: tighter inspection of fixed-size processing frame boundaries
//! - **Phase Continuity**: half-cycle phase slips in a reference tone
//! - **Fidelity**: RMS error and SNR against a known input, whole or windowed
//! - **Reports**: time-ordered findings with per-channel summaries
//!
//! The core never touches files. Streams are built in memory by the caller
//! (see `rf-glitch-io` for CSV / raw / WAV ingestion).
//!
//! ## Example
//!
//! ```rust,ignore
//! use rf_glitch::{AnalysisConfig, GlitchAnalyzer, SampleStream};
//!
//! let stream = SampleStream::from_interleaved(&samples, 2, 44100.0)?;
//! let config = AnalysisConfig::new(44100.0, 0.1, 0.01)
//!     .with_frame_size(512)
//!     .with_boundary_analysis();
//!
//! let report = GlitchAnalyzer::new(config).analyze(&stream)?;
//! for finding in report.findings() {
//!     println!("{:?}", finding);
//! }
//! ```

pub mod analyzer;
pub mod boundary;
pub mod config;
pub mod discontinuity;
pub mod fidelity;
pub mod phase;
pub mod report;
pub mod stats;
pub mod stream;

pub use analyzer::GlitchAnalyzer;
pub use boundary::{BoundaryIssue, BufferBoundaryAnalyzer};
pub use config::{AnalysisConfig, BoundaryPolicy};
pub use discontinuity::{largest, DiscontinuityDetector, DiscontinuityEvent};
pub use fidelity::{rms, FidelityAccumulator, FidelityComparator, FidelityMetrics, WindowedFidelity};
pub use phase::{PhaseContinuityAnalyzer, PhaseJump};
pub use report::{
    ChannelFidelity, ChannelSummary, FidelityReport, Finding, FindingKind, Report,
    ReportAggregator, ReportSummary,
};
pub use stats::ChannelStats;
pub use stream::{Channel, ChannelId, SampleStream};

use thiserror::Error;

/// Errors raised by the analysis core
///
/// Numeric edge cases (silent reference, lossless output) are never errors;
/// they surface as signed-infinity SNR values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GlitchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sample rate mismatch: expected={expected}Hz, actual={actual}Hz")]
    SampleRateMismatch { expected: f64, actual: f64 },

    #[error("Channel {0} not found in stream")]
    ChannelNotFound(ChannelId),
}

pub type Result<T> = std::result::Result<T, GlitchError>;

impl GlitchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

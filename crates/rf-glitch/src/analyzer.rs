//! Orchestration of a full analysis run

use crate::boundary::{BoundaryIssue, BufferBoundaryAnalyzer};
use crate::config::AnalysisConfig;
use crate::discontinuity::{DiscontinuityDetector, DiscontinuityEvent};
use crate::fidelity::{FidelityAccumulator, FidelityComparator};
use crate::phase::{PhaseContinuityAnalyzer, PhaseJump};
use crate::report::{ChannelFidelity, FidelityReport, Report, ReportAggregator};
use crate::stats::ChannelStats;
use crate::stream::{ChannelId, SampleStream};
use crate::{GlitchError, Result};
use rayon::prelude::*;

/// Output of the per-channel scans for one channel
struct ChannelFindings {
    channel_id: ChannelId,
    discontinuities: Vec<DiscontinuityEvent>,
    boundary_issues: Vec<BoundaryIssue>,
    phase_jumps: Vec<PhaseJump>,
    stats: ChannelStats,
}

/// Runs every configured analysis over a stream and aggregates the result
///
/// Channels are scanned in parallel; each worker only reads its own channel
/// and fills its own result vectors, which are joined before aggregation.
#[derive(Debug, Clone)]
pub struct GlitchAnalyzer {
    config: AnalysisConfig,
}

impl GlitchAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Scan a single stream (no fidelity section)
    pub fn analyze(&self, stream: &SampleStream) -> Result<Report> {
        self.run(stream, None)
    }

    /// Scan `output` and compare it channel by channel against `reference`
    pub fn analyze_against(&self, output: &SampleStream, reference: &SampleStream) -> Result<Report> {
        self.run(output, Some(reference))
    }

    fn run(&self, stream: &SampleStream, reference: Option<&SampleStream>) -> Result<Report> {
        let config = &self.config;
        config.validate()?;
        check_rate(config.sample_rate, stream.sample_rate())?;
        if let Some(reference) = reference {
            check_rate(config.sample_rate, reference.sample_rate())?;
        }

        let frame_size = config.frame_size.or(stream.frame_size());
        if config.analyze_boundaries && frame_size.is_none() {
            return Err(GlitchError::invalid(
                "boundary analysis requested without a frame size",
            ));
        }

        let mut detector = DiscontinuityDetector::new(config.discontinuity_threshold);
        if let Some(frame_size) = frame_size {
            detector = detector.with_frames(frame_size, config.effective_boundary_policy())?;
        }

        let boundary = match frame_size {
            Some(frame_size) if config.analyze_boundaries => {
                Some(BufferBoundaryAnalyzer::new(frame_size, config.boundary_threshold)?)
            }
            _ => None,
        };

        let phase = config
            .expected_frequency
            .map(|frequency| PhaseContinuityAnalyzer::new(config.sample_rate, frequency))
            .transpose()?;

        if stream.is_ragged() {
            log::warn!(
                "ragged stream: analyzing shared prefix of {} samples",
                stream.shared_len()
            );
        }

        let sample_rate = stream.sample_rate();
        let channels: Vec<(ChannelId, &[f64])> = stream.channels().collect();

        let per_channel: Vec<ChannelFindings> = channels
            .into_par_iter()
            .map(|(channel_id, samples)| ChannelFindings {
                channel_id,
                discontinuities: detector.detect(channel_id, samples, sample_rate),
                boundary_issues: boundary
                    .as_ref()
                    .map(|b| b.analyze(channel_id, samples, sample_rate))
                    .unwrap_or_default(),
                phase_jumps: phase
                    .as_ref()
                    .map(|p| p.analyze(channel_id, samples))
                    .unwrap_or_default(),
                stats: ChannelStats::compute(samples),
            })
            .collect();

        let fidelity = reference
            .map(|reference| self.compare_fidelity(stream, reference))
            .transpose()?;

        let mut events = Vec::new();
        let mut issues = Vec::new();
        let mut jumps = Vec::new();
        let mut stats = Vec::with_capacity(per_channel.len());

        for findings in per_channel {
            events.extend(findings.discontinuities);
            issues.extend(findings.boundary_issues);
            jumps.extend(findings.phase_jumps);
            stats.push((findings.channel_id, findings.stats));
        }

        let report = ReportAggregator::new(config.top_k)
            .with_channel_stats(stats)
            .aggregate(events, issues, jumps, fidelity);

        log::info!(
            "analyzed {} channel(s) x {} samples: {} discontinuities, {} boundary issues, {} phase jumps",
            stream.num_channels(),
            stream.shared_len(),
            report.summary.total_discontinuities,
            report.summary.total_boundary_issues,
            report.summary.total_phase_jumps
        );

        Ok(report)
    }

    fn compare_fidelity(&self, output: &SampleStream, reference: &SampleStream) -> Result<FidelityReport> {
        let mut overall = FidelityAccumulator::new();
        let mut channels = Vec::new();

        for (channel_id, output_samples) in output.channels() {
            let reference_samples = match reference.channel(channel_id) {
                Ok(channel) => channel.prefix(reference.shared_len()),
                Err(_) => {
                    log::warn!(
                        "channel {} has no reference counterpart, skipping fidelity",
                        channel_id
                    );
                    continue;
                }
            };

            if reference_samples.len() != output_samples.len() {
                log::debug!(
                    "channel {}: truncating fidelity comparison to {} samples",
                    channel_id,
                    reference_samples.len().min(output_samples.len())
                );
            }

            overall.extend(reference_samples, output_samples);

            let windows = self
                .config
                .fidelity_window
                .map(|window| {
                    FidelityComparator::compare_windows(reference_samples, output_samples, window)
                })
                .unwrap_or_default();

            channels.push(ChannelFidelity {
                channel_id,
                metrics: FidelityComparator::compare(reference_samples, output_samples),
                windows,
            });
        }

        if channels.is_empty() {
            return Err(GlitchError::invalid(
                "output and reference streams share no channel ids",
            ));
        }

        Ok(FidelityReport {
            overall: overall.finish(),
            channels,
        })
    }
}

fn check_rate(expected: f64, actual: f64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(GlitchError::SampleRateMismatch { expected, actual })
    }
}

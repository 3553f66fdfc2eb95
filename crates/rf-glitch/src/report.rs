//! Aggregation of analyzer output into a single report

use crate::boundary::BoundaryIssue;
use crate::discontinuity::{largest, DiscontinuityEvent};
use crate::fidelity::{FidelityMetrics, WindowedFidelity};
use crate::phase::PhaseJump;
use crate::stats::ChannelStats;
use crate::stream::ChannelId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Kind of a finding; also the tie-break order for equal timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Discontinuity,
    Boundary,
    Phase,
}

/// Borrowed view over one finding of any kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Finding<'a> {
    Discontinuity(&'a DiscontinuityEvent),
    Boundary(&'a BoundaryIssue),
    Phase(&'a PhaseJump),
}

impl Finding<'_> {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::Discontinuity(_) => FindingKind::Discontinuity,
            Finding::Boundary(_) => FindingKind::Boundary,
            Finding::Phase(_) => FindingKind::Phase,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            Finding::Discontinuity(e) => e.channel_id,
            Finding::Boundary(b) => b.channel_id,
            Finding::Phase(p) => p.channel_id,
        }
    }

    pub fn sample_index(&self) -> usize {
        match self {
            Finding::Discontinuity(e) => e.sample_index,
            Finding::Boundary(b) => b.sample_index,
            Finding::Phase(p) => p.sample_index,
        }
    }

    pub fn time_seconds(&self) -> f64 {
        match self {
            Finding::Discontinuity(e) => e.time_seconds,
            Finding::Boundary(b) => b.time_seconds,
            Finding::Phase(p) => p.time_seconds,
        }
    }

    /// Size of the defect in its own unit (amplitude or radians)
    pub fn magnitude(&self) -> f64 {
        match self {
            Finding::Discontinuity(e) => e.jump_magnitude,
            Finding::Boundary(b) => b.discontinuity,
            Finding::Phase(p) => p.phase_jump_radians,
        }
    }
}

fn time_order(
    a_time: f64,
    a_index: usize,
    a_channel: ChannelId,
    b_time: f64,
    b_index: usize,
    b_channel: ChannelId,
) -> Ordering {
    a_time
        .total_cmp(&b_time)
        .then(a_index.cmp(&b_index))
        .then(a_channel.cmp(&b_channel))
}

/// Fidelity of one output channel against its reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFidelity {
    pub channel_id: ChannelId,
    pub metrics: FidelityMetrics,

    /// Windowed series, empty unless a fidelity window was configured
    #[serde(default)]
    pub windows: Vec<WindowedFidelity>,
}

/// Fidelity across all compared channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    /// All compared sample pairs pooled together
    pub overall: FidelityMetrics,

    pub channels: Vec<ChannelFidelity>,
}

/// Finding counts for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    pub discontinuities: usize,

    /// Discontinuities that sit on a frame boundary (tagged)
    pub frame_boundary_discontinuities: usize,

    pub boundary_issues: usize,
    pub phase_jumps: usize,

    /// Largest jump magnitude seen (0 when there were none)
    pub max_jump: f64,

    /// Largest discontinuities, biggest first
    pub largest: Vec<DiscontinuityEvent>,

    pub stats: Option<ChannelStats>,
}

impl ChannelSummary {
    fn empty(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            discontinuities: 0,
            frame_boundary_discontinuities: 0,
            boundary_issues: 0,
            phase_jumps: 0,
            max_jump: 0.0,
            largest: Vec::new(),
            stats: None,
        }
    }

    pub fn total(&self) -> usize {
        self.discontinuities + self.boundary_issues + self.phase_jumps
    }
}

/// Counts per channel and overall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub channels: Vec<ChannelSummary>,
    pub total_discontinuities: usize,
    pub total_boundary_issues: usize,
    pub total_phase_jumps: usize,
    pub total_findings: usize,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Time-ordered discontinuities
    pub discontinuities: Vec<DiscontinuityEvent>,

    /// Time-ordered seam issues
    pub boundary_issues: Vec<BoundaryIssue>,

    /// Time-ordered phase jumps
    pub phase_jumps: Vec<PhaseJump>,

    /// Present when an output was compared against a reference
    pub fidelity: Option<FidelityReport>,

    pub summary: ReportSummary,
}

impl Report {
    /// Every finding merged in time order
    ///
    /// Equal timestamps order by sample index, channel, then kind
    /// (discontinuity, boundary, phase). Nothing is deduplicated.
    pub fn findings(&self) -> Vec<Finding<'_>> {
        let mut findings: Vec<Finding<'_>> = self
            .discontinuities
            .iter()
            .map(Finding::Discontinuity)
            .chain(self.boundary_issues.iter().map(Finding::Boundary))
            .chain(self.phase_jumps.iter().map(Finding::Phase))
            .collect();

        findings.sort_by(|a, b| {
            time_order(
                a.time_seconds(),
                a.sample_index(),
                a.channel_id(),
                b.time_seconds(),
                b.sample_index(),
                b.channel_id(),
            )
            .then(a.kind().cmp(&b.kind()))
        });
        findings
    }

    /// No findings of any kind
    pub fn is_clean(&self) -> bool {
        self.summary.total_findings == 0
    }

    pub fn channel_summary(&self, channel_id: ChannelId) -> Option<&ChannelSummary> {
        self.summary
            .channels
            .iter()
            .find(|c| c.channel_id == channel_id)
    }
}

/// Merges analyzer output into a [`Report`]
///
/// Pure aggregation: ordering and counting only, no thresholding.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    top_k: usize,
    stats: Vec<(ChannelId, ChannelStats)>,
}

impl ReportAggregator {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            stats: Vec::new(),
        }
    }

    /// Attach per-channel level statistics to the summary
    pub fn with_channel_stats(mut self, stats: Vec<(ChannelId, ChannelStats)>) -> Self {
        self.stats = stats;
        self
    }

    pub fn aggregate(
        &self,
        mut events: Vec<DiscontinuityEvent>,
        mut boundary_issues: Vec<BoundaryIssue>,
        mut phase_jumps: Vec<PhaseJump>,
        fidelity: Option<FidelityReport>,
    ) -> Report {
        events.sort_by(|a, b| {
            time_order(
                a.time_seconds,
                a.sample_index,
                a.channel_id,
                b.time_seconds,
                b.sample_index,
                b.channel_id,
            )
        });
        boundary_issues.sort_by(|a, b| {
            time_order(
                a.time_seconds,
                a.sample_index,
                a.channel_id,
                b.time_seconds,
                b.sample_index,
                b.channel_id,
            )
        });
        phase_jumps.sort_by(|a, b| {
            time_order(
                a.time_seconds,
                a.sample_index,
                a.channel_id,
                b.time_seconds,
                b.sample_index,
                b.channel_id,
            )
        });

        let summary = self.summarize(&events, &boundary_issues, &phase_jumps);

        Report {
            discontinuities: events,
            boundary_issues,
            phase_jumps,
            fidelity,
            summary,
        }
    }

    fn summarize(
        &self,
        events: &[DiscontinuityEvent],
        boundary_issues: &[BoundaryIssue],
        phase_jumps: &[PhaseJump],
    ) -> ReportSummary {
        let mut channels: BTreeMap<ChannelId, ChannelSummary> = BTreeMap::new();

        for (id, stats) in &self.stats {
            channels
                .entry(*id)
                .or_insert_with(|| ChannelSummary::empty(*id))
                .stats = Some(stats.clone());
        }

        let mut per_channel_events: BTreeMap<ChannelId, Vec<DiscontinuityEvent>> = BTreeMap::new();
        for event in events {
            let summary = channels
                .entry(event.channel_id)
                .or_insert_with(|| ChannelSummary::empty(event.channel_id));
            summary.discontinuities += 1;
            if event.is_frame_boundary {
                summary.frame_boundary_discontinuities += 1;
            }
            summary.max_jump = summary.max_jump.max(event.jump_magnitude);
            per_channel_events
                .entry(event.channel_id)
                .or_default()
                .push(event.clone());
        }

        for issue in boundary_issues {
            channels
                .entry(issue.channel_id)
                .or_insert_with(|| ChannelSummary::empty(issue.channel_id))
                .boundary_issues += 1;
        }

        for jump in phase_jumps {
            channels
                .entry(jump.channel_id)
                .or_insert_with(|| ChannelSummary::empty(jump.channel_id))
                .phase_jumps += 1;
        }

        for (id, channel_events) in &per_channel_events {
            if let Some(summary) = channels.get_mut(id) {
                summary.largest = largest(channel_events, self.top_k);
            }
        }

        let total_discontinuities = events.len();
        let total_boundary_issues = boundary_issues.len();
        let total_phase_jumps = phase_jumps.len();

        ReportSummary {
            channels: channels.into_values().collect(),
            total_discontinuities,
            total_boundary_issues,
            total_phase_jumps,
            total_findings: total_discontinuities + total_boundary_issues + total_phase_jumps,
        }
    }
}

//! Text, JSON and CSV views of an analysis report

use crate::Result;
use rf_glitch::{ChannelSummary, FidelityMetrics, Finding, FindingKind, Report};
use std::path::Path;
use std::str::FromStr;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Findings table plus summary, for terminals
    #[default]
    Text,
    /// Full report as pretty-printed JSON
    Json,
    /// One row per finding
    Csv,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown report format '{}' (expected text, json or csv)", other)),
        }
    }
}

const CSV_HEADER: &str = "kind,channel,sample_index,frame,time_seconds,before,after,magnitude";

/// Render a report in the given format
pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(to_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Csv => Ok(to_csv(report)),
    }
}

/// Render and write a report to a file
pub fn save<P: AsRef<Path>>(report: &Report, path: P, format: ReportFormat) -> Result<()> {
    let content = render(report, format)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn kind_label(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::Discontinuity => "discontinuity",
        FindingKind::Boundary => "boundary",
        FindingKind::Phase => "phase",
    }
}

/// Frame index plus the sample values around the defect
///
/// Phase jumps carry no "before" value and no frame.
fn finding_columns(finding: &Finding<'_>) -> (Option<usize>, Option<f64>, f64) {
    match finding {
        Finding::Discontinuity(e) => (e.frame_index, Some(e.value_before), e.value_after),
        Finding::Boundary(b) => (Some(b.frame_index), Some(b.last_sample_prev), b.first_sample_curr),
        Finding::Phase(p) => (None, None, p.sample_value),
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn format_db(db: f64) -> String {
    if db.is_infinite() {
        if db > 0.0 { "+inf dB" } else { "-inf dB" }.to_string()
    } else {
        format!("{:.2} dB", db)
    }
}

fn format_metrics(metrics: &FidelityMetrics) -> String {
    format!(
        "RMS error {:.6} | SNR {} | peak error {:.6} @ {} | {} samples",
        metrics.rms_error,
        format_db(metrics.snr_db),
        metrics.peak_error,
        metrics.peak_error_index,
        metrics.samples
    )
}

fn channel_line(channel: &ChannelSummary) -> String {
    let mut line = format!(
        "  Channel {}: {} discontinuities ({} on frame boundaries), {} boundary issues, {} phase jumps, max jump {:.6}",
        channel.channel_id,
        channel.discontinuities,
        channel.frame_boundary_discontinuities,
        channel.boundary_issues,
        channel.phase_jumps,
        channel.max_jump
    );

    if let Some(stats) = &channel.stats {
        line.push_str(&format!(
            "\n    peak {} | rms {} | crest {:.2} | dc {:+.6}",
            format_db(stats.peak_db()),
            format_db(stats.rms_db()),
            stats.crest_factor,
            stats.dc_offset
        ));
    }

    line
}

fn to_text(report: &Report) -> String {
    let title = "Glitch Analysis Report";
    let summary = &report.summary;
    let mut output = String::new();

    output.push_str(&format!("{}\n", title));
    output.push_str(&format!("{}\n\n", "=".repeat(title.len())));

    output.push_str(&format!(
        "Findings: {} | Discontinuities: {} | Boundary issues: {} | Phase jumps: {}\n",
        summary.total_findings,
        summary.total_discontinuities,
        summary.total_boundary_issues,
        summary.total_phase_jumps
    ));
    output.push_str(&format!(
        "Status: {}\n\n",
        if report.is_clean() { "CLEAN" } else { "GLITCHES FOUND" }
    ));

    let findings = report.findings();
    if !findings.is_empty() {
        output.push_str(&format!(
            "{:<14} {:>8} {:>12} {:>8} {:>12} {:>12} {:>12}\n",
            "Kind", "Frame", "Time (s)", "Channel", "Before", "After", "Jump"
        ));
        output.push_str(&"-".repeat(84));
        output.push('\n');

        for finding in &findings {
            let (frame, before, after) = finding_columns(finding);
            output.push_str(&format!(
                "{:<14} {:>8} {:>12.6} {:>8} {:>12} {:>12.6} {:>12.6}\n",
                kind_label(finding.kind()),
                or_dash(frame),
                finding.time_seconds(),
                finding.channel_id(),
                or_dash(before.map(|v| format!("{:.6}", v))),
                after,
                finding.magnitude()
            ));
        }

        output.push_str(&"-".repeat(84));
        output.push_str("\n\n");
    }

    if !summary.channels.is_empty() {
        output.push_str("Channels:\n");
        for channel in &summary.channels {
            output.push_str(&channel_line(channel));
            output.push('\n');
        }
        output.push('\n');
    }

    if let Some(fidelity) = &report.fidelity {
        output.push_str("Fidelity:\n");
        output.push_str(&format!("  Overall: {}\n", format_metrics(&fidelity.overall)));
        for channel in &fidelity.channels {
            output.push_str(&format!(
                "  Channel {}: {}\n",
                channel.channel_id,
                format_metrics(&channel.metrics)
            ));

            // only the windows that actually lost something
            for window in channel.windows.iter().filter(|w| !w.metrics.is_lossless()) {
                output.push_str(&format!(
                    "    [{}..{}) {}\n",
                    window.start,
                    window.end,
                    format_metrics(&window.metrics)
                ));
            }
        }
    }

    output
}

fn to_csv(report: &Report) -> String {
    let mut output = String::from(CSV_HEADER);
    output.push('\n');

    for finding in report.findings() {
        let (frame, before, after) = finding_columns(&finding);
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            kind_label(finding.kind()),
            finding.channel_id(),
            finding.sample_index(),
            frame.map(|f| f.to_string()).unwrap_or_default(),
            finding.time_seconds(),
            before.map(|v| v.to_string()).unwrap_or_default(),
            after,
            finding.magnitude()
        ));
    }

    output
}

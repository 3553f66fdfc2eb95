// ============================================================================
// rf-glitch end-to-end scenarios
// Concrete render-pipeline defects run through the full analyzer
// ============================================================================

use approx::assert_relative_eq;
use rf_glitch::{
    AnalysisConfig, BoundaryPolicy, DiscontinuityDetector, FidelityComparator, FindingKind,
    GlitchAnalyzer, PhaseContinuityAnalyzer, SampleStream,
};
use std::f64::consts::{PI, TAU};

// ============================================================================
// TEST UTILITIES
// ============================================================================

/// Sine tone with an optional hard phase offset from `reset_at` on
fn tone_with_reset(
    frequency: f64,
    sample_rate: f64,
    len: usize,
    reset_at: Option<usize>,
    offset: f64,
) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let reset = match reset_at {
                Some(at) if i >= at => offset,
                _ => 0.0,
            };
            0.8 * (TAU * frequency * i as f64 / sample_rate + reset).sin()
        })
        .collect()
}

/// A tone rendered in fixed blocks where every block restarts its phase,
/// the classic missing-state-carryover bug
fn block_restart_tone(frequency: f64, sample_rate: f64, block: usize, blocks: usize) -> Vec<f64> {
    (0..block * blocks)
        .map(|i| 0.8 * (TAU * frequency * (i % block) as f64 / sample_rate).sin())
        .collect()
}

// ============================================================================
// DISCONTINUITIES
// ============================================================================

#[test]
fn spike_produces_jump_up_and_jump_down() {
    let samples = [0.0, 0.0, 0.0, 0.5, 0.0, 0.0];
    let events = DiscontinuityDetector::new(0.1).detect(0, &samples, 44100.0);

    let indices: Vec<usize> = events.iter().map(|e| e.sample_index).collect();
    assert_eq!(indices, vec![3, 4]);
    for event in &events {
        assert_relative_eq!(event.jump_magnitude, 0.5);
    }
}

#[test]
fn seam_step_is_excluded_but_reported_as_boundary_issue() {
    let stream =
        SampleStream::from_channels(44100.0, vec![vec![0.0, 0.0, 0.0, 0.2, 0.0, 0.0]]).unwrap();
    let config = AnalysisConfig::new(44100.0, 0.1, 0.15)
        .with_frame_size(3)
        .with_boundary_analysis()
        .with_boundary_policy(BoundaryPolicy::Exclude);

    let report = GlitchAnalyzer::new(config).analyze(&stream).unwrap();

    // the seam itself (index 3) never appears as a discontinuity
    assert!(report.discontinuities.iter().all(|e| e.sample_index != 3));
    assert_eq!(report.boundary_issues.len(), 1);
    assert_eq!(report.boundary_issues[0].frame_index, 1);
    assert_relative_eq!(report.boundary_issues[0].discontinuity, 0.2);
}

#[test]
fn seam_clean_when_boundary_threshold_above_step() {
    let stream =
        SampleStream::from_channels(44100.0, vec![vec![0.0, 0.0, 0.0, 0.2, 0.0, 0.0]]).unwrap();
    let config = AnalysisConfig::new(44100.0, 0.1, 0.3)
        .with_frame_size(3)
        .with_boundary_analysis();

    let report = GlitchAnalyzer::new(config).analyze(&stream).unwrap();
    assert!(report.boundary_issues.is_empty());
}

#[test]
fn block_restarts_are_found_at_every_seam() {
    let sample_rate = 44100.0;
    let block = 512;
    let samples = block_restart_tone(440.0, sample_rate, block, 8);
    let stream = SampleStream::from_channels(sample_rate, vec![samples.clone(), samples]).unwrap();

    let config = AnalysisConfig::render_pipeline(sample_rate, block);
    let report = GlitchAnalyzer::new(config).analyze(&stream).unwrap();

    // 7 inspected seams per channel, every one restarts the phase
    assert_eq!(report.boundary_issues.len(), 14);
    for channel in &report.summary.channels {
        assert_eq!(channel.boundary_issues, 7);
    }

    // the glitch scan tags (rather than skips) seams once boundary analysis is on
    assert!(report.discontinuities.iter().all(|e| e.is_frame_boundary));
}

// ============================================================================
// PHASE
// ============================================================================

#[test]
fn phase_reset_is_flagged_at_its_index() {
    let sample_rate = 44100.0;
    let samples = tone_with_reset(440.0, sample_rate, 4410, Some(1000), PI);

    let jumps = PhaseContinuityAnalyzer::new(sample_rate, 440.0)
        .unwrap()
        .analyze(0, &samples);

    assert!(jumps.iter().any(|j| j.sample_index == 1000));
    assert!(jumps.iter().all(|j| (999..=1001).contains(&j.sample_index)));
}

#[test]
fn clean_tone_with_slight_detune_has_no_phase_jumps() {
    let sample_rate = 48000.0;
    let samples = tone_with_reset(1010.0, sample_rate, 48000, None, 0.0);

    let jumps = PhaseContinuityAnalyzer::new(sample_rate, 1000.0)
        .unwrap()
        .analyze(0, &samples);
    assert!(jumps.is_empty());
}

#[test]
fn phase_jump_and_discontinuity_share_an_index() {
    let sample_rate = 44100.0;
    // reset at the waveform crest so the amplitude step is large too
    let reset_at = 25;
    let samples: Vec<f64> = (0..441)
        .map(|i| {
            let reset = if i >= reset_at { PI } else { 0.0 };
            (TAU * 441.0 * i as f64 / sample_rate + reset).sin()
        })
        .collect();

    let stream = SampleStream::from_channels(sample_rate, vec![samples]).unwrap();
    let config = AnalysisConfig::new(sample_rate, 0.5, 0.01).with_expected_frequency(441.0);
    let report = GlitchAnalyzer::new(config).analyze(&stream).unwrap();

    let at_reset: Vec<FindingKind> = report
        .findings()
        .iter()
        .filter(|f| f.sample_index() == reset_at)
        .map(|f| f.kind())
        .collect();
    assert_eq!(at_reset, vec![FindingKind::Discontinuity, FindingKind::Phase]);
}

// ============================================================================
// FIDELITY
// ============================================================================

#[test]
fn lossless_render_has_infinite_snr() {
    let samples = tone_with_reset(440.0, 44100.0, 2048, None, 0.0);
    let reference = SampleStream::from_channels(44100.0, vec![samples.clone()]).unwrap();
    let output = SampleStream::from_channels(44100.0, vec![samples]).unwrap();

    let report = GlitchAnalyzer::new(AnalysisConfig::new(44100.0, 0.1, 0.01))
        .analyze_against(&output, &reference)
        .unwrap();

    let fidelity = report.fidelity.unwrap();
    assert_eq!(fidelity.overall.rms_error, 0.0);
    assert_eq!(fidelity.overall.snr_db, f64::INFINITY);
}

#[test]
fn truncated_output_compares_on_shared_length() {
    let reference: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
    let output: Vec<f64> = (0..7).map(|i| i as f64 * 0.1 + 0.05).collect();

    let truncated = FidelityComparator::compare(&reference, &output);
    let sliced = FidelityComparator::compare(&reference[..7], &output[..7]);
    assert_eq!(truncated, sliced);
}

#[test]
fn windowed_fidelity_localizes_a_dropout() {
    let samples = tone_with_reset(440.0, 44100.0, 4096, None, 0.0);
    let mut rendered = samples.clone();
    for sample in &mut rendered[2048..2112] {
        *sample = 0.0;
    }

    let windows = FidelityComparator::compare_windows(&samples, &rendered, 512);
    assert_eq!(windows.len(), 8);
    for (i, window) in windows.iter().enumerate() {
        if i == 4 {
            assert!(window.metrics.rms_error > 0.0);
            assert!(window.metrics.snr_db.is_finite());
        } else {
            assert!(window.metrics.is_lossless(), "window {} should be clean", i);
        }
    }
}

// ============================================================================
// RAGGED STREAMS
// ============================================================================

#[test]
fn ragged_stream_analyzes_shared_prefix() {
    let stream = SampleStream::ragged(
        44100.0,
        vec![(0, vec![0.0, 0.0, 0.0, 0.0]), (1, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.9])],
    )
    .unwrap();

    let report = GlitchAnalyzer::new(AnalysisConfig::new(44100.0, 0.1, 0.01))
        .analyze(&stream)
        .unwrap();

    // the jump at index 5 lies beyond the shared prefix of 4 samples
    assert!(report.is_clean());
}

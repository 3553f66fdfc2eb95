//! Property-based tests for the analysis core using proptest.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rf-glitch --test properties
//! ```

use proptest::prelude::*;

use rf_glitch::{
    AnalysisConfig, BoundaryPolicy, BufferBoundaryAnalyzer, DiscontinuityDetector,
    FidelityComparator, GlitchAnalyzer, SampleStream,
};

/// Channels in the nominal [-1, 1] range
fn channel(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0f64..1.0, 0..max_len)
}

/// Non-silent channels (at least one sample well away from zero)
fn audible_channel(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (prop::collection::vec(-1.0f64..1.0, 1..max_len), 0.1f64..1.0).prop_map(|(mut x, loud)| {
        x[0] = loud;
        x
    })
}

proptest! {
    /// Every qualifying index appears exactly once, and nothing else does.
    #[test]
    fn every_jump_above_threshold_reported_once(
        samples in channel(256),
        threshold in 0.0f64..1.5,
    ) {
        let events = DiscontinuityDetector::new(threshold).detect(0, &samples, 44100.0);

        let expected: Vec<usize> = (1..samples.len())
            .filter(|&i| (samples[i] - samples[i - 1]).abs() > threshold)
            .collect();
        let found: Vec<usize> = events.iter().map(|e| e.sample_index).collect();
        prop_assert_eq!(found, expected);
    }

    /// EXCLUDE never reports a frame-boundary index.
    #[test]
    fn exclude_policy_never_reports_boundaries(
        samples in channel(512),
        frame_size in 1usize..64,
        threshold in 0.0f64..1.0,
    ) {
        let events = DiscontinuityDetector::new(threshold)
            .with_frames(frame_size, BoundaryPolicy::Exclude)
            .unwrap()
            .detect(0, &samples, 44100.0);

        for event in &events {
            prop_assert!(event.sample_index % frame_size != 0);
            prop_assert!(!event.is_frame_boundary);
        }
    }

    /// INCLUDE-AND-TAG tags exactly the boundary indices.
    #[test]
    fn include_policy_tags_boundaries(
        samples in channel(512),
        frame_size in 1usize..64,
        threshold in 0.0f64..1.0,
    ) {
        let plain = DiscontinuityDetector::new(threshold).detect(0, &samples, 44100.0);
        let tagged = DiscontinuityDetector::new(threshold)
            .with_frames(frame_size, BoundaryPolicy::IncludeAndTag)
            .unwrap()
            .detect(0, &samples, 44100.0);

        prop_assert_eq!(plain.len(), tagged.len());
        for event in &tagged {
            prop_assert_eq!(event.is_frame_boundary, event.sample_index % frame_size == 0);
        }
    }

    /// Boundary issues only ever sit on frame starts.
    #[test]
    fn boundary_issues_sit_on_frame_starts(
        samples in channel(512),
        frame_size in 1usize..64,
    ) {
        let analyzer = BufferBoundaryAnalyzer::new(frame_size, 0.0).unwrap();
        let issues = analyzer.analyze(0, &samples, 44100.0);

        // zero threshold reports every inspected seam
        prop_assert_eq!(issues.len(), analyzer.seam_count(samples.len()));
        for issue in &issues {
            prop_assert_eq!(issue.sample_index, issue.frame_index * frame_size);
            prop_assert!(issue.frame_index >= 1);
        }
    }

    /// compare(x, x) is lossless with +inf SNR for any non-silent x.
    #[test]
    fn identity_is_lossless(x in audible_channel(256)) {
        let metrics = FidelityComparator::compare(&x, &x);
        prop_assert_eq!(metrics.rms_error, 0.0);
        prop_assert_eq!(metrics.snr_db, f64::INFINITY);
    }

    /// A constant offset c gives rms_error == |c|.
    #[test]
    fn constant_offset_rms_error(x in audible_channel(256), c in 0.001f64..0.5) {
        let y: Vec<f64> = x.iter().map(|s| s + c).collect();
        let metrics = FidelityComparator::compare(&x, &y);
        prop_assert!((metrics.rms_error - c).abs() <= 1e-9 * c.max(1.0));
    }

    /// Comparing unequal lengths equals comparing both sliced to the shorter.
    #[test]
    fn truncation_equals_slicing(a in channel(64), b in channel(64)) {
        let n = a.len().min(b.len());
        prop_assert_eq!(
            FidelityComparator::compare(&a, &b),
            FidelityComparator::compare(&a[..n], &b[..n])
        );
    }

    /// Re-running an analysis over the same input yields the same report.
    #[test]
    fn analysis_is_idempotent(
        left in prop::collection::vec(-1.0f64..1.0, 64),
        right in prop::collection::vec(-1.0f64..1.0, 64),
    ) {
        let stream = SampleStream::from_channels(44100.0, vec![left, right]).unwrap();
        let analyzer = GlitchAnalyzer::new(
            AnalysisConfig::new(44100.0, 0.3, 0.05)
                .with_frame_size(16)
                .with_boundary_analysis()
                .with_expected_frequency(1000.0),
        );

        let first = analyzer.analyze(&stream).unwrap();
        let second = analyzer.analyze(&stream).unwrap();
        prop_assert_eq!(first, second);
    }
}

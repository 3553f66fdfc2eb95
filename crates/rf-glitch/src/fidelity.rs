//! Fidelity of a processed channel against its known input

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// RMS error and SNR between a reference and an output channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityMetrics {
    /// `rms(output - reference)`
    pub rms_error: f64,

    /// `rms(reference)`
    pub reference_rms: f64,

    /// `20·log10(reference_rms / rms_error)`; `+∞` when lossless,
    /// `−∞` when the reference is silent but the output is not
    #[serde(with = "signed_infinity")]
    pub snr_db: f64,

    /// Largest absolute sample difference
    pub peak_error: f64,

    /// Index of the largest difference (first occurrence)
    pub peak_error_index: usize,

    /// Number of sample pairs compared
    pub samples: usize,
}

impl FidelityMetrics {
    /// SNR in dB with the signed-infinity conventions
    pub fn snr_db_from(reference_rms: f64, rms_error: f64) -> f64 {
        if rms_error == 0.0 {
            f64::INFINITY
        } else if reference_rms == 0.0 {
            f64::NEG_INFINITY
        } else {
            20.0 * (reference_rms / rms_error).log10()
        }
    }

    /// Output matched the reference sample for sample
    pub fn is_lossless(&self) -> bool {
        self.rms_error == 0.0
    }
}

/// Metrics for one window of a windowed comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedFidelity {
    /// First sample of the window
    pub start: usize,

    /// One past the last sample of the window
    pub end: usize,

    pub metrics: FidelityMetrics,
}

/// Running sums for an incremental comparison
///
/// Pairs can be pushed one at a time or a slice at a time; `finish` yields
/// the same metrics a single-shot comparison over the same pairs would.
#[derive(Debug, Clone, Default)]
pub struct FidelityAccumulator {
    sum_sq_error: f64,
    sum_sq_reference: f64,
    peak_error: f64,
    peak_error_index: usize,
    count: usize,
}

impl FidelityAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reference: f64, output: f64) {
        let error = output - reference;
        self.sum_sq_error += error * error;
        self.sum_sq_reference += reference * reference;

        if error.abs() > self.peak_error {
            self.peak_error = error.abs();
            self.peak_error_index = self.count;
        }
        self.count += 1;
    }

    /// Push a pair of slices, truncated to the shorter one
    pub fn extend(&mut self, reference: &[f64], output: &[f64]) {
        for (&r, &o) in reference.iter().zip(output) {
            self.push(r, o);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(&self) -> FidelityMetrics {
        let (rms_error, reference_rms) = if self.count == 0 {
            (0.0, 0.0)
        } else {
            let n = self.count as f64;
            ((self.sum_sq_error / n).sqrt(), (self.sum_sq_reference / n).sqrt())
        };

        FidelityMetrics {
            rms_error,
            reference_rms,
            snr_db: FidelityMetrics::snr_db_from(reference_rms, rms_error),
            peak_error: self.peak_error,
            peak_error_index: self.peak_error_index,
            samples: self.count,
        }
    }
}

/// Compares an output channel against its reference
///
/// Length mismatches are resolved by truncating both sides to the shorter
/// length; that is the defined behavior, not an error.
pub struct FidelityComparator;

impl FidelityComparator {
    /// Whole-channel comparison
    pub fn compare(reference: &[f64], output: &[f64]) -> FidelityMetrics {
        let mut acc = FidelityAccumulator::new();
        acc.extend(reference, output);
        acc.finish()
    }

    /// Comparison restricted to `range`, clamped to the truncated length
    ///
    /// `peak_error_index` is absolute (relative to the start of the channel).
    pub fn compare_range(reference: &[f64], output: &[f64], range: Range<usize>) -> FidelityMetrics {
        let len = reference.len().min(output.len());
        let end = range.end.min(len);
        let start = range.start.min(end);

        let mut metrics = Self::compare(&reference[start..end], &output[start..end]);
        metrics.peak_error_index += start;
        metrics
    }

    /// Consecutive non-overlapping windows of `window` samples
    ///
    /// The last window may be shorter. A zero window yields nothing.
    pub fn compare_windows(reference: &[f64], output: &[f64], window: usize) -> Vec<WindowedFidelity> {
        if window == 0 {
            return Vec::new();
        }

        let len = reference.len().min(output.len());
        (0..len)
            .step_by(window)
            .map(|start| {
                let end = (start + window).min(len);
                WindowedFidelity {
                    start,
                    end,
                    metrics: Self::compare_range(reference, output, start..end),
                }
            })
            .collect()
    }
}

/// Root mean square of a slice; 0 for an empty slice
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// JSON has no infinities: non-finite SNR values travel as strings
mod signed_infinity {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid SNR value: {}", other))),
            },
        }
    }
}

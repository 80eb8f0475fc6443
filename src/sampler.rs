use crate::core::utils::count_mismatches;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of the sifted key disclosed for public comparison.
pub const SAMPLE_FRACTION: f64 = 0.3;

/// Error rate (percent) above which eavesdropping is declared.
pub const DETECTION_THRESHOLD_PERCENT: f64 = 11.0;

/// Outcome of comparing the disclosed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    ChannelSecure,
    EavesdroppingDetected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::ChannelSecure => f.write_str("CHANNEL_SECURE"),
            Verdict::EavesdroppingDetected => f.write_str("EAVESDROPPING_DETECTED"),
        }
    }
}

/// Statistics of one error-estimation round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEstimate {
    /// Positions in the sifted key that were compared, in draw order.
    pub sample_indices: Vec<usize>,
    pub sample_size: usize,
    pub error_count: usize,
    /// Percentage in `[0, 100]`.
    pub error_rate: f64,
    pub verdict: Verdict,
    /// Set when the sifted key was empty and nothing could be sampled.
    pub degenerate: bool,
}

impl ErrorEstimate {
    /// All-zero estimate for an empty sifted key.
    pub fn degenerate() -> Self {
        Self {
            sample_indices: Vec::new(),
            sample_size: 0,
            error_count: 0,
            error_rate: 0.0,
            verdict: Verdict::ChannelSecure,
            degenerate: true,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

/// `max(1, ceil(0.3 * sifted_len))`, or 0 for an empty key.
pub fn sample_size(sifted_len: usize) -> usize {
    if sifted_len == 0 {
        return 0;
    }
    let size = (sifted_len as f64 * SAMPLE_FRACTION).ceil() as usize;
    size.clamp(1, sifted_len)
}

/// Maps an error rate to a verdict using the fixed detection threshold.
pub fn verdict_for(error_rate: f64) -> Verdict {
    if error_rate > DETECTION_THRESHOLD_PERCENT {
        Verdict::EavesdroppingDetected
    } else {
        Verdict::ChannelSecure
    }
}

/// Draws positions of the sifted key to disclose.
///
/// The sample is taken without replacement from `0..sifted_len`.
#[derive(Debug, Clone, Default)]
pub struct Sampler;

impl Sampler {
    pub fn new() -> Self {
        Self
    }

    /// Uniform sample of `sample_size(sifted_len)` distinct indices.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, sifted_len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..sifted_len).collect();
        // Shuffle and keep the prefix
        indices.shuffle(rng);
        indices.truncate(sample_size(sifted_len));
        indices
    }

    /// Compares a random sample of the two sifted keys.
    ///
    /// The keys are only read. An empty key yields
    /// [`ErrorEstimate::degenerate`].
    pub fn estimate_errors<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        alice_sifted: &[bool],
        bob_sifted: &[bool],
    ) -> ErrorEstimate {
        let sifted_len = alice_sifted.len().min(bob_sifted.len());
        if sifted_len == 0 {
            return ErrorEstimate::degenerate();
        }

        let sample_indices = self.draw(rng, sifted_len);
        let sample_size = sample_indices.len();
        let error_count = count_mismatches(alice_sifted, bob_sifted, &sample_indices);
        let error_rate = (error_count as f64 / sample_size as f64) * 100.0;

        ErrorEstimate {
            sample_indices,
            sample_size,
            error_count,
            error_rate,
            verdict: verdict_for(error_rate),
            degenerate: false,
        }
    }
}

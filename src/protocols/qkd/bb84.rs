//! BB84 Quantum Key Distribution Protocol, one stage at a time.
//!
//! A [`Bb84Session`] walks a message through the protocol:
//!
//! ```text
//! EMPTY -> ENCODED -> BASES_CHOSEN -> TRANSMITTED
//!       [-> EVE_INTERCEPTED -> EVE_FORWARDED]
//!       -> BOB_MEASURED -> BASES_COMPARED -> KEY_SIFTED -> ERROR_ESTIMATED
//! ```
//!
//! Every operation checks the current stage and fails with
//! [`SessionError::InvalidTransition`] when called out of order. Setting a new
//! message discards the whole transcript at once, including manual basis edits.

use crate::core::basis::{Basis, BasisSequence, Party};
use crate::core::channels::QuantumChannel;
use crate::core::encoding::encode;
use crate::core::errors::SessionError;
use crate::core::measurements::Qubit;
use crate::core::utils::select;
use crate::sampler::{ErrorEstimate, Sampler, Verdict};
use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest bit string for which channel noise may be enabled.
pub const MIN_BITS_FOR_NOISE: usize = 128;

/// Protocol stages in forward order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Stage {
    #[default]
    Empty,
    Encoded,
    BasesChosen,
    Transmitted,
    EveIntercepted,
    EveForwarded,
    BobMeasured,
    BasesCompared,
    KeySifted,
    ErrorEstimated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Empty => "EMPTY",
            Stage::Encoded => "ENCODED",
            Stage::BasesChosen => "BASES_CHOSEN",
            Stage::Transmitted => "TRANSMITTED",
            Stage::EveIntercepted => "EVE_INTERCEPTED",
            Stage::EveForwarded => "EVE_FORWARDED",
            Stage::BobMeasured => "BOB_MEASURED",
            Stage::BasesCompared => "BASES_COMPARED",
            Stage::KeySifted => "KEY_SIFTED",
            Stage::ErrorEstimated => "ERROR_ESTIMATED",
        };
        f.write_str(name)
    }
}

/// Switches read when Alice transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Route every qubit through Eve's intercept-resend attack.
    pub eavesdropper_enabled: bool,
    /// Flip Bob's results with probability
    /// [`NOISE_FLIP_PROBABILITY`](crate::NOISE_FLIP_PROBABILITY).
    pub noise_enabled: bool,
}

/// Everything derived from the current message. Replaced as a whole.
#[derive(Debug, Clone, Default)]
struct Transcript {
    stage: Stage,
    message: String,
    bits: Vec<bool>,
    alice_bases: BasisSequence,
    eve_bases: BasisSequence,
    bob_bases: BasisSequence,
    eve_results: Option<Vec<bool>>,
    bob_results: Option<Vec<bool>>,
    matching_indices: Option<Vec<usize>>,
    sifted: Option<(Vec<bool>, Vec<bool>)>,
    estimate: Option<ErrorEstimate>,
    alice_bases_visible: bool,
}

impl Transcript {
    fn for_message(message: &str) -> Self {
        let bits = encode(message);
        let n = bits.len();
        Self {
            stage: if n == 0 { Stage::Empty } else { Stage::Encoded },
            message: message.to_owned(),
            bits,
            alice_bases: BasisSequence::default_filled(n),
            eve_bases: BasisSequence::default_filled(n),
            bob_bases: BasisSequence::default_filled(n),
            alice_bases_visible: true,
            ..Self::default()
        }
    }
}

/// Stateful BB84 run driven by a presentation layer.
///
/// # Type Parameters
///
/// - `R`: source of randomness for basis draws, measurement collapse, noise
///   and sampling.
#[derive(Debug, Clone)]
pub struct Bb84Session<R: Rng = ThreadRng> {
    rng: R,
    config: SessionConfig,
    sampler: Sampler,
    transcript: Transcript,
}

impl Bb84Session {
    /// Creates an empty session using the thread-local RNG.
    pub fn new() -> Self {
        Self::with_rng(rand::rng())
    }
}

impl Default for Bb84Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Bb84Session<R> {
    /// Creates an empty session drawing randomness from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            config: SessionConfig::default(),
            sampler: Sampler::new(),
            transcript: Transcript::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.transcript.stage
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn message(&self) -> &str {
        &self.transcript.message
    }

    /// The encoded message.
    pub fn bits(&self) -> &[bool] {
        &self.transcript.bits
    }

    pub fn len(&self) -> usize {
        self.transcript.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.bits.is_empty()
    }

    pub fn bases(&self, party: Party) -> &BasisSequence {
        match party {
            Party::Alice => &self.transcript.alice_bases,
            Party::Eve => &self.transcript.eve_bases,
            Party::Bob => &self.transcript.bob_bases,
        }
    }

    /// Measurement results of `party`, once that party has measured.
    ///
    /// Alice never measures, so she always yields `None`.
    pub fn measurements(&self, party: Party) -> Option<&[bool]> {
        match party {
            Party::Alice => None,
            Party::Eve => self.transcript.eve_results.as_deref(),
            Party::Bob => self.transcript.bob_results.as_deref(),
        }
    }

    /// Qubits Eve re-prepared and sent to Bob: each of her results in her
    /// own basis. `None` until she has forwarded.
    pub fn forwarded_qubits(&self) -> Option<Vec<Qubit>> {
        if self.stage() < Stage::EveForwarded {
            return None;
        }
        let t = &self.transcript;
        let eve_results = t.eve_results.as_deref()?;
        Some(
            eve_results
                .iter()
                .zip(t.eve_bases.iter())
                .map(|(&bit, basis)| Qubit::prepare(bit, basis))
                .collect(),
        )
    }

    pub fn matching_indices(&self) -> Option<&[usize]> {
        self.transcript.matching_indices.as_deref()
    }

    /// `(alice_sifted, bob_sifted)`, aligned position by position.
    pub fn sifted_keys(&self) -> Option<(&[bool], &[bool])> {
        self.transcript
            .sifted
            .as_ref()
            .map(|(a, b)| (a.as_slice(), b.as_slice()))
    }

    pub fn sample_indices(&self) -> Option<&[usize]> {
        self.transcript
            .estimate
            .as_ref()
            .map(|e| e.sample_indices.as_slice())
    }

    pub fn error_estimate(&self) -> Option<&ErrorEstimate> {
        self.transcript.estimate.as_ref()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.transcript.estimate.as_ref().map(|e| e.verdict)
    }

    /// Presentation flag: whether Alice's bases are currently revealed.
    pub fn alice_bases_visible(&self) -> bool {
        self.transcript.alice_bases_visible
    }

    /// Encodes `message` and resets every derived sequence.
    ///
    /// Manual basis edits, measurements, sifted keys and estimates are all
    /// discarded. An empty message leaves the session in [`Stage::Empty`].
    pub fn set_message(&mut self, message: &str) -> Stage {
        self.transcript = Transcript::for_message(message);

        if self.config.noise_enabled && self.len() < MIN_BITS_FOR_NOISE {
            tracing::debug!(
                "Noise disabled: {} bits is below the {} bit minimum",
                self.len(),
                MIN_BITS_FOR_NOISE
            );
            self.config.noise_enabled = false;
        }

        tracing::debug!("Message set: {} bits, stage {}", self.len(), self.stage());
        self.stage()
    }

    /// Turns the eavesdropper on or off. Only before transmission.
    pub fn set_eavesdropper(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.require_configurable("set_eavesdropper")?;
        self.config.eavesdropper_enabled = enabled;
        tracing::debug!("Eavesdropper enabled: {}", enabled);
        Ok(())
    }

    /// Turns channel noise on or off. Only before transmission.
    ///
    /// Enabling is refused for messages shorter than
    /// [`MIN_BITS_FOR_NOISE`] bits: nothing changes and `Ok(false)` is
    /// returned. Otherwise returns the new setting.
    pub fn set_noise(&mut self, enabled: bool) -> Result<bool, SessionError> {
        self.require_configurable("set_noise")?;

        if enabled && self.len() < MIN_BITS_FOR_NOISE {
            tracing::warn!(
                "Refusing to enable noise: {} bits, need at least {}",
                self.len(),
                MIN_BITS_FOR_NOISE
            );
            return Ok(self.config.noise_enabled);
        }

        self.config.noise_enabled = enabled;
        tracing::debug!("Noise enabled: {}", enabled);
        Ok(enabled)
    }

    /// Applies both switches. Returns the configuration actually in effect.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<SessionConfig, SessionError> {
        self.set_eavesdropper(config.eavesdropper_enabled)?;
        self.set_noise(config.noise_enabled)?;
        Ok(self.config)
    }

    /// Sets one basis of `party`.
    pub fn set_basis(
        &mut self,
        party: Party,
        index: usize,
        basis: Basis,
    ) -> Result<(), SessionError> {
        self.require_editable("set_basis", party)?;
        let bases = self.bases_mut(party);
        let len = bases.len();
        bases
            .set(index, basis)
            .ok_or(SessionError::IndexOutOfRange { party, index, len })?;

        tracing::debug!("{} basis {} set to {}", party, index, basis);
        self.mark_bases_chosen(party);
        Ok(())
    }

    /// Flips one basis of `party` and returns the new value.
    pub fn toggle_basis(&mut self, party: Party, index: usize) -> Result<Basis, SessionError> {
        self.require_editable("toggle_basis", party)?;
        let bases = self.bases_mut(party);
        let len = bases.len();
        let basis = bases
            .toggle(index)
            .ok_or(SessionError::IndexOutOfRange { party, index, len })?;

        tracing::debug!("{} basis {} toggled to {}", party, index, basis);
        self.mark_bases_chosen(party);
        Ok(basis)
    }

    /// Replaces every basis of `party` with a fresh uniform draw.
    pub fn randomize_bases(&mut self, party: Party) -> Result<(), SessionError> {
        self.require_editable("randomize_bases", party)?;
        let fresh = BasisSequence::randomized(self.len(), &mut self.rng);
        *self.bases_mut(party) = fresh;

        tracing::debug!("{} bases randomized", party);
        self.mark_bases_chosen(party);
        Ok(())
    }

    /// Shows or hides Alice's bases. Only meaningful once they are committed.
    pub fn toggle_alice_visibility(&mut self) -> Result<bool, SessionError> {
        if self.stage() < Stage::Transmitted {
            return Err(self.invalid("toggle_alice_visibility"));
        }
        let visible = !self.transcript.alice_bases_visible;
        self.transcript.alice_bases_visible = visible;
        Ok(visible)
    }

    /// Alice sends her prepared qubits. Her bases are read-only afterwards.
    pub fn transmit(&mut self) -> Result<(), SessionError> {
        self.require("transmit", &[Stage::Encoded, Stage::BasesChosen])?;

        self.transcript.alice_bases_visible = false;
        self.advance(Stage::Transmitted);
        tracing::debug!(
            "Transmitted {} qubits (eavesdropper: {}, noise: {})",
            self.len(),
            self.config.eavesdropper_enabled,
            self.config.noise_enabled
        );
        Ok(())
    }

    /// Eve measures every qubit in her own basis.
    pub fn intercept_and_measure(&mut self) -> Result<&[bool], SessionError> {
        self.require("intercept_and_measure", &[Stage::Transmitted])?;
        if !self.config.eavesdropper_enabled {
            return Err(self.invalid("intercept_and_measure"));
        }

        let t = &self.transcript;
        let n = t.bits.len();
        let mut eve_results = Vec::with_capacity(n);

        let prepared = t.bits.iter().zip(t.alice_bases.iter());
        for ((&bit, a_basis), e_basis) in prepared.zip(t.eve_bases.iter()) {
            let qubit = Qubit::prepare(bit, a_basis);
            let hop = QuantumChannel::intercept(&mut self.rng, qubit, e_basis);
            eve_results.push(hop.eve_bit);
        }

        self.advance(Stage::EveIntercepted);
        Ok(self.transcript.eve_results.insert(eve_results).as_slice())
    }

    /// Eve sends her re-prepared qubits on to Bob.
    pub fn forward_to_bob(&mut self) -> Result<(), SessionError> {
        self.require("forward_to_bob", &[Stage::EveIntercepted])?;
        self.advance(Stage::EveForwarded);
        Ok(())
    }

    /// Bob measures whatever reached him in his own basis.
    ///
    /// With Eve on the line that is her re-prepared qubits, never Alice's
    /// originals. Noise, when enabled, flips each result independently.
    pub fn measure_bob(&mut self) -> Result<&[bool], SessionError> {
        let ready = match self.stage() {
            Stage::Transmitted => !self.config.eavesdropper_enabled,
            Stage::EveForwarded => true,
            _ => false,
        };
        if !ready {
            return Err(self.invalid("measure_bob"));
        }

        let channel = if self.config.noise_enabled {
            QuantumChannel::noisy()
        } else {
            QuantumChannel::ideal()
        };

        let incoming = self.forwarded_qubits().unwrap_or_else(|| {
            let t = &self.transcript;
            t.bits
                .iter()
                .zip(t.alice_bases.iter())
                .map(|(&bit, basis)| Qubit::prepare(bit, basis))
                .collect()
        });

        let t = &self.transcript;
        let bob_results: Vec<bool> = incoming
            .into_iter()
            .zip(t.bob_bases.iter())
            .map(|(qubit, b_basis)| channel.transmit(&mut self.rng, qubit, b_basis))
            .collect();

        self.advance(Stage::BobMeasured);
        Ok(self.transcript.bob_results.insert(bob_results).as_slice())
    }

    /// Publicly compares Alice's and Bob's bases. No randomness.
    pub fn compare_bases(&mut self) -> Result<&[usize], SessionError> {
        self.require("compare_bases", &[Stage::BobMeasured])?;

        let matching = matching_indices(&self.transcript.alice_bases, &self.transcript.bob_bases);
        tracing::debug!("{} of {} bases match", matching.len(), self.len());

        self.advance(Stage::BasesCompared);
        Ok(self.transcript.matching_indices.insert(matching).as_slice())
    }

    /// Keeps only matching-basis positions of both parties' bits.
    pub fn sift_key(&mut self) -> Result<(&[bool], &[bool]), SessionError> {
        self.require("sift_key", &[Stage::BasesCompared])?;

        let t = &self.transcript;
        let matching = t.matching_indices.as_deref().unwrap_or_default();
        let bob_results = t.bob_results.as_deref().unwrap_or_default();
        let alice_sifted = sift(&t.bits, matching);
        let bob_sifted = sift(bob_results, matching);

        self.advance(Stage::KeySifted);
        let (a, b) = self.transcript.sifted.insert((alice_sifted, bob_sifted));
        Ok((a.as_slice(), b.as_slice()))
    }

    /// Compares a fresh random sample of the sifted keys.
    ///
    /// May be repeated once estimated; each call draws a new sample.
    /// An empty sifted key fails with [`SessionError::DegenerateSample`] and
    /// leaves the stage unchanged.
    pub fn estimate_errors(&mut self) -> Result<&ErrorEstimate, SessionError> {
        self.require("estimate_errors", &[Stage::KeySifted, Stage::ErrorEstimated])?;

        let (alice_sifted, bob_sifted) = match &self.transcript.sifted {
            Some((a, b)) if !a.is_empty() => (a, b),
            _ => {
                tracing::warn!("Error estimation requested on an empty sifted key");
                return Err(SessionError::DegenerateSample);
            }
        };

        let estimate = self
            .sampler
            .estimate_errors(&mut self.rng, alice_sifted, bob_sifted);
        tracing::info!(
            "Sampled {} of {} sifted bits: {} errors ({:.2}%), {}",
            estimate.sample_size,
            alice_sifted.len(),
            estimate.error_count,
            estimate.error_rate,
            estimate.verdict
        );

        self.advance(Stage::ErrorEstimated);
        Ok(&*self.transcript.estimate.insert(estimate))
    }

    fn bases_mut(&mut self, party: Party) -> &mut BasisSequence {
        match party {
            Party::Alice => &mut self.transcript.alice_bases,
            Party::Eve => &mut self.transcript.eve_bases,
            Party::Bob => &mut self.transcript.bob_bases,
        }
    }

    fn mark_bases_chosen(&mut self, party: Party) {
        if party == Party::Alice && self.stage() == Stage::Encoded {
            self.advance(Stage::BasesChosen);
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!("Stage {} -> {}", self.transcript.stage, next);
        self.transcript.stage = next;
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            stage: self.stage(),
        }
    }

    fn require(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), SessionError> {
        if allowed.contains(&self.stage()) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn require_configurable(&self, operation: &'static str) -> Result<(), SessionError> {
        self.require(operation, &[Stage::Empty, Stage::Encoded, Stage::BasesChosen])
    }

    /// A party's bases lock once that party has acted on them.
    fn require_editable(&self, operation: &'static str, party: Party) -> Result<(), SessionError> {
        let locked_from = match party {
            Party::Alice => Stage::Transmitted,
            Party::Eve => Stage::EveIntercepted,
            Party::Bob => Stage::BobMeasured,
        };
        let stage = self.stage();
        if stage == Stage::Empty || stage >= locked_from {
            return Err(self.invalid(operation));
        }
        Ok(())
    }
}

/// Positions where both parties chose the same basis, ascending.
pub fn matching_indices(alice: &BasisSequence, bob: &BasisSequence) -> Vec<usize> {
    alice
        .iter()
        .zip(bob.iter())
        .enumerate()
        .filter_map(|(i, (a, b))| (a == b).then_some(i))
        .collect()
}

/// Bits at `matching` positions, in order.
pub fn sift(bits: &[bool], matching: &[usize]) -> Vec<bool> {
    select(bits, matching)
}

/// BB84 results
#[derive(Debug, Clone)]
pub struct BB84Result {
    pub raw_length: usize,
    pub sifted_length: usize,
    pub estimate: ErrorEstimate,
    pub eve_intercepted: bool,
    pub noise_applied: bool,
    pub alice_bits: Vec<bool>,
    pub alice_bases: Vec<Basis>,
    pub bob_bases: Vec<Basis>,
    pub bob_results: Vec<bool>,
    pub alice_sifted_key: Vec<bool>,
    pub bob_sifted_key: Vec<bool>,
}

/// Runs BB84 end to end with random bases for every party.
pub fn run(message: &str, config: SessionConfig) -> Result<BB84Result, SessionError> {
    run_with_rng(rand::rng(), message, config)
}

/// Like [`run`], drawing randomness from `rng`.
///
/// An empty message fails with [`SessionError::InvalidTransition`]. An empty
/// sifted key yields a degenerate estimate instead of an error.
pub fn run_with_rng<R: Rng>(
    rng: R,
    message: &str,
    config: SessionConfig,
) -> Result<BB84Result, SessionError> {
    let mut session = Bb84Session::with_rng(rng);
    session.set_message(message);
    let config = session.set_config(config)?;

    session.randomize_bases(Party::Alice)?;
    if config.eavesdropper_enabled {
        session.randomize_bases(Party::Eve)?;
    }
    session.randomize_bases(Party::Bob)?;
    session.transmit()?;

    if config.eavesdropper_enabled {
        session.intercept_and_measure()?;
        session.forward_to_bob()?;
    }

    session.measure_bob()?;
    session.compare_bases()?;
    session.sift_key()?;

    let estimate = match session.estimate_errors() {
        Ok(estimate) => estimate.clone(),
        Err(SessionError::DegenerateSample) => ErrorEstimate::degenerate(),
        Err(e) => return Err(e),
    };

    let (alice_sifted, bob_sifted) = session.sifted_keys().unwrap_or_default();

    Ok(BB84Result {
        raw_length: session.len(),
        sifted_length: alice_sifted.len(),
        estimate,
        eve_intercepted: config.eavesdropper_enabled,
        noise_applied: config.noise_enabled,
        alice_bits: session.bits().to_vec(),
        alice_bases: session.bases(Party::Alice).as_slice().to_vec(),
        bob_bases: session.bases(Party::Bob).as_slice().to_vec(),
        bob_results: session.measurements(Party::Bob).unwrap_or_default().to_vec(),
        alice_sifted_key: alice_sifted.to_vec(),
        bob_sifted_key: bob_sifted.to_vec(),
    })
}

use crate::core::basis::Basis;
use crate::core::errors::ChannelError;
use crate::core::measurements::Qubit;
use rand::Rng;

/// Flip probability used when channel noise is switched on.
pub const NOISE_FLIP_PROBABILITY: f64 = 0.05;

/// Classical model of the quantum channel between Alice and Bob.
///
/// Measurement follows [`crate::core::measurements::measure`]; the channel adds
/// an optional independent bit flip on the receiver's result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuantumChannel {
    flip_probability: f64,
}

/// Result of a qubit passing through an intercept-resend attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interception {
    /// What Eve read.
    pub eve_bit: bool,
    /// What Eve sends on: her measured bit in her own basis.
    pub forwarded: Qubit,
}

impl QuantumChannel {
    /// Noise-free channel.
    pub fn ideal() -> Self {
        Self {
            flip_probability: 0.0,
        }
    }

    /// Channel with the fixed teaching noise level.
    pub fn noisy() -> Self {
        Self {
            flip_probability: NOISE_FLIP_PROBABILITY,
        }
    }

    /// Bit Flip Channel -> X with probability `p`
    pub fn bit_flip(p: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(p)?;
        Ok(Self { flip_probability: p })
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }

    pub fn is_noisy(&self) -> bool {
        self.flip_probability > 0.0
    }

    /// Flips `bit` with the channel's flip probability.
    pub fn apply_noise<R: Rng + ?Sized>(&self, rng: &mut R, bit: bool) -> bool {
        if self.flip_probability > 1e-12 && rng.random_bool(self.flip_probability) {
            !bit
        } else {
            bit
        }
    }

    /// Receiver measures `qubit` in `receiver_basis`, then noise applies.
    pub fn transmit<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        qubit: Qubit,
        receiver_basis: Basis,
    ) -> bool {
        let bit = qubit.measure(rng, receiver_basis);
        self.apply_noise(rng, bit)
    }

    /// Eve measures `qubit` in `eve_basis` and re-prepares her result.
    ///
    /// The forwarded qubit never carries the sender's original bit or basis.
    pub fn intercept<R: Rng + ?Sized>(
        rng: &mut R,
        qubit: Qubit,
        eve_basis: Basis,
    ) -> Interception {
        let eve_bit = qubit.measure(rng, eve_basis);
        Interception {
            eve_bit,
            forwarded: Qubit::prepare(eve_bit, eve_basis),
        }
    }
}

/// Checks if `p` is a valid probability
fn validate_prob(p: f64) -> Result<(), ChannelError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ChannelError::InvalidProbability(p));
    }
    Ok(())
}

use crate::core::basis::Basis;
use rand::Rng;

/// A bit prepared by a sender in a given basis.
///
/// Only ever passed through the channel, never stored as session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Qubit {
    pub bit: bool,
    pub basis: Basis,
}

impl Qubit {
    /// Prepares `bit` in `basis`
    pub fn prepare(bit: bool, basis: Basis) -> Self {
        Self { bit, basis }
    }

    /// Measures the qubit in `basis`. See [`measure`].
    pub fn measure<R: Rng + ?Sized>(&self, rng: &mut R, basis: Basis) -> bool {
        measure(rng, self.bit, self.basis, basis)
    }
}

/// Outcome of measuring a sender's `(bit, basis)` with `receiver_basis`.
///
/// Matching bases return the sender's bit exactly. Mismatched bases collapse
/// to a uniformly random bit independent of the one sent. The result does
/// not record which of the two happened.
pub fn measure<R: Rng + ?Sized>(
    rng: &mut R,
    sender_bit: bool,
    sender_basis: Basis,
    receiver_basis: Basis,
) -> bool {
    if sender_basis == receiver_basis {
        sender_bit
    } else {
        rng.random_bool(0.5)
    }
}

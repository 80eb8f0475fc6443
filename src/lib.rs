//! Teaching simulation of the BB84 quantum key distribution protocol.
//!
//! Only the classical outcomes BB84 implies are modelled: matching bases
//! reproduce the sent bit, mismatched bases give a fair coin. The bit strings
//! produced here are not secret keys.

mod core;
pub mod protocols;
mod sampler;

pub use crate::core::channels::{Interception, NOISE_FLIP_PROBABILITY};
pub use crate::core::{
    BITS_PER_CHAR, Basis, BasisSequence, Party, QuantumChannel, Qubit, decode, encode, errors,
    measure, utils,
};
pub use crate::protocols::bb84::{
    BB84Result, Bb84Session, MIN_BITS_FOR_NOISE, SessionConfig, Stage,
};
pub use crate::sampler::{
    DETECTION_THRESHOLD_PERCENT, ErrorEstimate, SAMPLE_FRACTION, Sampler, Verdict, sample_size,
    verdict_for,
};

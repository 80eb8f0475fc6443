use crate::core::basis::Party;
use crate::protocols::qkd::bb84::Stage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Bit string length {0} is not a multiple of 8")]
    NotByteAligned(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Operation `{operation}` is not allowed in stage {stage}")]
    InvalidTransition {
        operation: &'static str,
        stage: Stage,
    },

    #[error("Basis index {index} out of range for {party} (length {len})")]
    IndexOutOfRange {
        party: Party,
        index: usize,
        len: usize,
    },

    #[error("Sifted key is empty, no sample can be drawn")]
    DegenerateSample,
}

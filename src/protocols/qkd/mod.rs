//! Quantum Key Distribution (QKD) Protocols.
//!
//! - **BB84**: The first quantum key distribution protocol, driven stage by
//!   stage through [`bb84::Bb84Session`] or end to end through [`bb84::run`].

pub mod bb84;

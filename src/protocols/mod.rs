//! Quantum Cryptography Protocols.
//!
//! This module contains the BB84 quantum key distribution protocol.

pub mod qkd;
pub use qkd::bb84;

pub(crate) mod basis;
pub(crate) mod channels;
pub(crate) mod encoding;
pub mod errors;
pub(crate) mod measurements;
pub mod utils;

pub use basis::{Basis, BasisSequence, Party};
pub use channels::QuantumChannel;
pub use encoding::{BITS_PER_CHAR, decode, encode};
pub use measurements::{Qubit, measure};

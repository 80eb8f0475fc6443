//! Measurement bases and per-party basis sequences.
//!
//! A `BasisSequence` is owned by exactly one party. Sequences are plain
//! values: cloning one never aliases another party's choices.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two incompatible BB84 measurement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Basis {
    /// `+` basis, the computational (Z) basis.
    #[default]
    Rectilinear,
    /// `x` basis, the Hadamard (X) basis.
    Diagonal,
}

impl Basis {
    /// Returns the other basis.
    pub fn flipped(self) -> Self {
        match self {
            Basis::Rectilinear => Basis::Diagonal,
            Basis::Diagonal => Basis::Rectilinear,
        }
    }

    /// Draws a basis with probability 0.5 each.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Basis::Diagonal
        } else {
            Basis::Rectilinear
        }
    }

    /// Display glyph. Presentation layers are free to pick their own.
    pub fn glyph(self) -> char {
        match self {
            Basis::Rectilinear => '+',
            Basis::Diagonal => 'x',
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Protocol roles that own a basis sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Alice,
    Eve,
    Bob,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Party::Alice => "Alice",
            Party::Eve => "Eve",
            Party::Bob => "Bob",
        };
        f.write_str(name)
    }
}

/// Ordered bases, one per bit of the encoded message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasisSequence {
    bases: Vec<Basis>,
}

impl BasisSequence {
    /// All-rectilinear sequence of length `n`.
    pub fn default_filled(n: usize) -> Self {
        Self {
            bases: vec![Basis::Rectilinear; n],
        }
    }

    /// Each entry drawn independently and uniformly.
    pub fn randomized<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        Self {
            bases: (0..n).map(|_| Basis::random(rng)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Basis> {
        self.bases.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Basis] {
        &self.bases
    }

    pub fn iter(&self) -> impl Iterator<Item = Basis> + '_ {
        self.bases.iter().copied()
    }

    /// Flips the entry at `index`, leaving every other entry untouched.
    ///
    /// Returns the new value, or `None` when `index` is out of range.
    pub fn toggle(&mut self, index: usize) -> Option<Basis> {
        let slot = self.bases.get_mut(index)?;
        *slot = slot.flipped();
        Some(*slot)
    }

    /// Overwrites the entry at `index`. `None` when out of range.
    pub fn set(&mut self, index: usize, basis: Basis) -> Option<Basis> {
        let slot = self.bases.get_mut(index)?;
        *slot = basis;
        Some(basis)
    }
}

impl From<Vec<Basis>> for BasisSequence {
    fn from(bases: Vec<Basis>) -> Self {
        Self { bases }
    }
}

impl FromIterator<Basis> for BasisSequence {
    fn from_iter<I: IntoIterator<Item = Basis>>(iter: I) -> Self {
        Self {
            bases: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BasisSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for basis in &self.bases {
            write!(f, "{basis}")?;
        }
        Ok(())
    }
}

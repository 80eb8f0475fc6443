//! Utility functions for bit sequences.
//!
//! This module contains helper functions for:
//! - Formatting bit sequences as `0`/`1` strings and parsing them back.
//! - Selecting positions of a sequence by index.
//! - Counting positional disagreements between two sequences.

/// Formats bits as a string of `0` and `1`.
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Parses a string of `0` and `1`. Returns `None` on any other character.
pub fn parse_bits(s: &str) -> Option<Vec<bool>> {
    s.chars()
        .map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

/// Collects `values[i]` for every `i` in `indices`, in the order given.
///
/// Indices past the end of `values` are skipped.
pub fn select<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().filter_map(|&i| values.get(i).copied()).collect()
}

/// Number of positions in `indices` where `a` and `b` differ.
pub fn count_mismatches(a: &[bool], b: &[bool], indices: &[usize]) -> usize {
    indices
        .iter()
        .filter(|&&i| matches!((a.get(i), b.get(i)), (Some(x), Some(y)) if x != y))
        .count()
}

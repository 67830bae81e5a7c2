//! Receive antenna permutation.
//!
//! The firmware sorts the receive chains by signal strength before reporting
//! CSI and records the order it used in `antenna_sel`, two bits per chain.

use ndarray::{s, Array3};

/// What the first `n` entries of a valid permutation sum to, for 1, 2 and 3
/// receive antennas.
const TRIANGLE: [u8; 3] = [1, 3, 6];

/// 1-based receive antenna permutation decoded from `antenna_sel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation(pub [u8; 3]);

/// Outcome of [`Permutation::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A single receive antenna, nothing to reorder.
    NotNeeded,
    /// The permutation is valid and was applied.
    Applied,
    /// The permutation is invalid; the matrix is left in firmware order.
    Invalid,
}

impl Permutation {
    /// Decodes the three 2-bit fields of `antenna_sel`.
    ///
    /// ```
    /// # use csi::perm::Permutation;
    /// assert_eq!(Permutation::from_antenna_sel(0b00_10_01).0, [2, 3, 1]);
    /// ```
    pub const fn from_antenna_sel(antenna_sel: u8) -> Self {
        Self([
            (antenna_sel & 0x3) + 1,
            ((antenna_sel >> 2) & 0x3) + 1,
            ((antenna_sel >> 4) & 0x3) + 1,
        ])
    }

    /// Whether the first `nrx` entries are a permutation of `1..=nrx`.
    ///
    /// Their sum must equal the triangular number for `nrx`, and each antenna
    /// must appear exactly once. The sum alone would accept `[2, 2, 2]` or
    /// `[1, 1, 4]` for `nrx = 3`, which duplicate a row or index past the
    /// receive axis.
    ///
    /// ```
    /// # use csi::perm::Permutation;
    /// assert!(Permutation([3, 1, 2]).is_valid(3));
    /// assert!(!Permutation([2, 2, 2]).is_valid(3));
    /// ```
    pub fn is_valid(&self, nrx: usize) -> bool {
        let Some(&expected) = nrx.checked_sub(1).and_then(|i| TRIANGLE.get(i)) else {
            return false;
        };

        let head = &self.0[..nrx];
        head.iter().sum::<u8>() == expected && (1..=nrx as u8).all(|k| head.contains(&k))
    }

    /// Decodes `antenna_sel` and decides whether the permutation should be
    /// applied to a matrix with `nrx` receive antennas.
    pub fn resolve(antenna_sel: u8, nrx: usize) -> (Self, Resolution) {
        let perm = Self::from_antenna_sel(antenna_sel);

        let resolution = if nrx == 1 {
            Resolution::NotNeeded
        } else if perm.is_valid(nrx) {
            Resolution::Applied
        } else {
            Resolution::Invalid
        };

        (perm, resolution)
    }

    /// Returns a copy of `csi` (indexed `[tx, rx, subcarrier]`) with the
    /// receive axis reordered: firmware antenna `k` moves to `perm[k] - 1`.
    ///
    /// # Panics
    ///
    /// Panics if the permutation is not valid for the matrix' receive axis.
    pub fn apply<A: Clone>(&self, csi: &Array3<A>) -> Array3<A> {
        let nrx = csi.dim().1;
        assert!(self.is_valid(nrx), "invalid permutation {:?}", self.0);

        let mut out = csi.clone();
        for (k, &p) in self.0[..nrx].iter().enumerate() {
            out.slice_mut(s![.., p as usize - 1, ..])
                .assign(&csi.slice(s![.., k, ..]));
        }

        out
    }
}

//! Lattice geometry interface.
//!
//! Lattice construction and symmetry-group machinery are external; this core
//! only consumes the enumeration of separations and the symmetry transform
//! that maps a raw separation to its canonical stored representative.

use crate::vertex::SpinChannel;

/// Canonical image of a `(basis, range, channel)` separation under the
/// lattice symmetry group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryImage {
    /// Channel the separation maps to.
    pub channel: SpinChannel,
    /// Reduced index of the symmetry-inequivalent representative.
    pub reduced_index: usize,
    /// Sign factor picked up by the transform. Carried but not applied when
    /// storing values; see the reducer.
    pub sign: f64,
}

/// Lattice geometry, fixed for the duration of a run.
pub trait Lattice: Send + Sync {
    /// Number of basis sites.
    fn basis_count(&self) -> usize;

    /// Number of sites in each basis site's symmetry range. Uniform across
    /// basis sites.
    fn range_count(&self) -> usize;

    /// Number of symmetry-inequivalent separations; reduced indices lie in
    /// `0..reduced_count()` and index 0 is the zero separation.
    fn reduced_count(&self) -> usize;

    /// Bravais lattice vectors.
    fn bravais_vectors(&self) -> &[[f64; 3]];

    /// Real-space positions of the basis sites.
    fn basis_positions(&self) -> &[[f64; 3]];

    /// Real-space position of the `range`-th site in the symmetry range of
    /// basis site `basis`.
    fn site_position(&self, basis: usize, range: usize) -> [f64; 3];

    /// Map a separation and channel to its canonical stored representative.
    fn symmetry_transform(&self, basis: usize, range: usize, channel: SpinChannel)
        -> SymmetryImage;
}

//! Symmetry reduction of susceptibility bundles into flat output buffers.
//!
//! The susceptibility bundle holds one value per symmetry-inequivalent
//! separation; the persisted output is a flat basis-major buffer over all raw
//! separations. The lattice's symmetry transform bridges the two.

use crate::bundle::ChannelBundle;
use crate::lattice::Lattice;
use crate::vertex::SpinChannel;

/// Maps raw separations to canonical bundle slots for one lattice.
pub struct SymmetryReducer<'a> {
    lattice: &'a dyn Lattice,
}

impl<'a> SymmetryReducer<'a> {
    pub fn new(lattice: &'a dyn Lattice) -> Self {
        Self { lattice }
    }

    /// Flat output offset of the separation `(basis, range)`.
    ///
    /// Offsets follow the fixed nested enumeration order: basis sites outer,
    /// each basis site's symmetry range inner.
    pub fn offset(&self, basis: usize, range: usize) -> usize {
        basis * self.lattice.range_count() + range
    }

    /// Value stored for separation `(basis, range)` in `channel`.
    ///
    /// The symmetry transform's sign factor is not multiplied in; the stored
    /// value is the bare canonical bundle entry. Callers that need the sign
    /// can query the transform directly.
    pub fn reduced_value(
        &self,
        bundle: &ChannelBundle,
        basis: usize,
        range: usize,
        channel: SpinChannel,
    ) -> f64 {
        let image = self.lattice.symmetry_transform(basis, range, channel);
        bundle.channel(image.channel)[image.reduced_index]
    }

    /// Flatten one channel of `bundle` into `out`, which must have length
    /// `basis_count * range_count`.
    pub fn flatten(&self, bundle: &ChannelBundle, channel: SpinChannel, out: &mut [f64]) {
        debug_assert_eq!(
            out.len(),
            self.lattice.basis_count() * self.lattice.range_count()
        );
        for basis in 0..self.lattice.basis_count() {
            for range in 0..self.lattice.range_count() {
                out[self.offset(basis, range)] =
                    self.reduced_value(bundle, basis, range, channel);
            }
        }
    }
}

//! Discretized Matsubara frequency mesh.
//!
//! The mesh is mirror-symmetric around zero and is constructed from a list of
//! strictly positive, strictly ascending mesh values; the negative half is
//! generated automatically. The integrator walks the mesh by index and uses
//! the clamped `greater`/`lesser` lookups to locate off-mesh region
//! boundaries.

use crate::error::MeasureError;

/// Mirror-symmetric frequency mesh.
#[derive(Debug, Clone)]
pub struct FrequencyGrid {
    /// Full mirrored mesh in ascending order, length `2 * positive`.
    values: Vec<f64>,
    /// Number of positive mesh points.
    positive: usize,
}

impl FrequencyGrid {
    /// Build a grid from strictly positive, strictly ascending mesh values.
    ///
    /// At least two values are required; the symmetry-related negative mesh
    /// points are generated automatically.
    pub fn new(mesh: &[f64]) -> Result<Self, MeasureError> {
        if mesh.len() < 2 {
            return Err(MeasureError::Grid(
                "frequency mesh must contain at least two values".to_string(),
            ));
        }
        if mesh.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MeasureError::Grid(
                "frequency mesh values must be strictly ascending".to_string(),
            ));
        }
        if mesh[0] <= 0.0 {
            return Err(MeasureError::Grid(
                "frequency mesh values must be strictly positive".to_string(),
            ));
        }

        let positive = mesh.len();
        let mut values = Vec::with_capacity(2 * positive);
        values.extend(mesh.iter().rev().map(|w| -w));
        values.extend_from_slice(mesh);
        Ok(Self { values, positive })
    }

    /// Number of mesh points in the full mirrored mesh.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frequency value of the mesh point at `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Index of the first (most negative) mesh point.
    pub fn first_negative(&self) -> usize {
        0
    }

    /// Index of the last (most positive) mesh point.
    pub fn last(&self) -> usize {
        self.values.len() - 1
    }

    /// Lower extent of the mesh.
    pub fn min_value(&self) -> f64 {
        self.values[0]
    }

    /// Upper extent of the mesh.
    pub fn max_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Index of the closest mesh point strictly greater than `w`.
    ///
    /// If no greater mesh point exists, returns the closest mesh point.
    pub fn greater(&self, w: f64) -> usize {
        if w < 0.0 {
            self.mirror(self.lesser_positive(-w))
        } else {
            self.greater_positive(w)
        }
    }

    /// Index of the closest mesh point strictly lesser than `w`.
    ///
    /// If no lesser mesh point exists, returns the closest mesh point.
    pub fn lesser(&self, w: f64) -> usize {
        if w < 0.0 {
            self.mirror(self.greater_positive(-w))
        } else {
            self.lesser_positive(w)
        }
    }

    /// Map a positive-half index to its mirror image in the negative half.
    fn mirror(&self, index: usize) -> usize {
        debug_assert!(index >= self.positive);
        2 * self.positive - 1 - index
    }

    fn greater_positive(&self, w: f64) -> usize {
        debug_assert!(w >= 0.0);
        let pos = &self.values[self.positive..];
        if w <= pos[0] {
            return self.positive;
        }
        for (i, &v) in pos.iter().enumerate().skip(1) {
            if v > w {
                return self.positive + i;
            }
        }
        self.values.len() - 1
    }

    fn lesser_positive(&self, w: f64) -> usize {
        debug_assert!(w >= 0.0);
        let pos = &self.values[self.positive..];
        if w <= pos[0] {
            return self.positive;
        }
        for (i, &v) in pos.iter().enumerate().skip(1) {
            if v > w {
                return self.positive + i - 1;
            }
        }
        self.values.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FrequencyGrid {
        FrequencyGrid::new(&[1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn test_mirrored_construction() {
        let g = grid();
        assert_eq!(g.len(), 6);
        assert_eq!(g.value(0), -3.0);
        assert_eq!(g.value(2), -1.0);
        assert_eq!(g.value(3), 1.0);
        assert_eq!(g.value(5), 3.0);
        assert_eq!(g.min_value(), -3.0);
        assert_eq!(g.max_value(), 3.0);
    }

    #[test]
    fn test_rejects_invalid_mesh() {
        assert!(FrequencyGrid::new(&[1.0]).is_err());
        assert!(FrequencyGrid::new(&[2.0, 1.0]).is_err());
        assert!(FrequencyGrid::new(&[-1.0, 2.0]).is_err());
        assert!(FrequencyGrid::new(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_greater_lesser_positive() {
        let g = grid();
        assert_eq!(g.value(g.greater(1.5)), 2.0);
        assert_eq!(g.value(g.lesser(1.5)), 1.0);
        // Below the smallest positive mesh point both lookups clamp to it.
        assert_eq!(g.value(g.greater(0.5)), 1.0);
        assert_eq!(g.value(g.lesser(0.5)), 1.0);
        // Above the largest mesh point both lookups clamp to it.
        assert_eq!(g.value(g.greater(10.0)), 3.0);
        assert_eq!(g.value(g.lesser(10.0)), 3.0);
    }

    #[test]
    fn test_greater_lesser_negative() {
        let g = grid();
        assert_eq!(g.value(g.greater(-1.5)), -1.0);
        assert_eq!(g.value(g.lesser(-1.5)), -2.0);
        // Beyond the negative extent both lookups clamp to the first point.
        assert_eq!(g.value(g.greater(-10.0)), -3.0);
        assert_eq!(g.value(g.lesser(-10.0)), -3.0);
        // Inside the gap around zero the lookups clamp to -1.
        assert_eq!(g.value(g.greater(-0.5)), -1.0);
        assert_eq!(g.value(g.lesser(-0.5)), -1.0);
    }

    #[test]
    fn test_exact_mesh_point_lookup() {
        let g = grid();
        // `greater` is strict at a mesh point, `lesser` is not.
        assert_eq!(g.value(g.greater(2.0)), 3.0);
        assert_eq!(g.value(g.lesser(2.0)), 2.0);
    }
}

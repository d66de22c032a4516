//! Singularity-aware trapezoidal quadrature on the frequency mesh.
//!
//! The propagators entering the correlation integrand have integrable
//! irregularities at frequencies determined by the flow parameter, so the
//! integration domain is split into regions whose boundaries sit exactly on
//! those irregularities. Within a region the integrand is sampled on the mesh
//! points plus the off-mesh boundary itself, with trapezoid weights that
//! account for the half-open cells next to the boundary.
//!
//! All primitives are vector-valued: the integrand writes a full
//! [`ChannelBundle`] per node into a caller-supplied scratch bundle, and the
//! result accumulates into a second bundle. Nested invocation threads the
//! caller's scratch buffers through, so no node ever allocates.

use crate::bundle::ChannelBundle;
use crate::grid::FrequencyGrid;

/// One active integration region around the flow parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// `(mesh point, off-mesh bound)`, irregularity at the upper boundary.
    RightSingular { min: usize, max: f64 },
    /// `(off-mesh bound, off-mesh bound)`, irregularities at both boundaries.
    BothSingular { min: f64, max: f64 },
    /// `(off-mesh bound, mesh point)`, irregularity at the lower boundary.
    LeftSingular { min: f64, max: usize },
}

/// Active integration regions for flow parameter `cutoff` and frequency
/// offset `nu`, given the extent of the frequency mesh.
///
/// The full domain splits into at most three disjoint regions; a region whose
/// bounds collapse against the mesh extent is omitted entirely.
pub fn singular_regions(grid: &FrequencyGrid, cutoff: f64, nu: f64) -> Vec<Region> {
    let mut regions = Vec::with_capacity(3);
    if -(nu + cutoff) > grid.min_value() {
        regions.push(Region::RightSingular {
            min: grid.first_negative(),
            max: -cutoff - nu,
        });
    }
    if nu - cutoff > cutoff {
        regions.push(Region::BothSingular {
            min: -nu + cutoff,
            max: -cutoff,
        });
    }
    if cutoff < grid.max_value() {
        regions.push(Region::LeftSingular {
            min: cutoff,
            max: grid.last(),
        });
    }
    regions
}

/// Integrate `integrand` over every active region and accumulate the results
/// into `acc`. `acc` is not cleared; the caller may have seeded it with
/// boundary-independent terms.
pub fn integrate_singular<F>(
    grid: &FrequencyGrid,
    cutoff: f64,
    nu: f64,
    mut integrand: F,
    eval: &mut ChannelBundle,
    region_result: &mut ChannelBundle,
    acc: &mut ChannelBundle,
) where
    F: FnMut(f64, &mut ChannelBundle),
{
    for region in singular_regions(grid, cutoff, nu) {
        match region {
            Region::RightSingular { min, max } => {
                integrate_right_singular(grid, min, max, &mut integrand, eval, region_result)
            }
            Region::BothSingular { min, max } => {
                integrate_both_singular(grid, min, max, &mut integrand, eval, region_result)
            }
            Region::LeftSingular { min, max } => {
                integrate_left_singular(grid, min, max, &mut integrand, eval, region_result)
            }
        }
        acc.add_assign(region_result);
    }
}

/// Trapezoidal integration from the off-mesh point `min` up to the mesh point
/// `max`, with the irregularity approaching from the left boundary.
pub fn integrate_left_singular<F>(
    grid: &FrequencyGrid,
    min: f64,
    max: usize,
    mut integrand: F,
    eval: &mut ChannelBundle,
    out: &mut ChannelBundle,
) where
    F: FnMut(f64, &mut ChannelBundle),
{
    debug_assert!(min <= grid.value(max));

    out.reset();
    let mut umin = grid.greater(min);
    if umin != max {
        integrand(min, eval);
        out.mult_add(grid.value(umin) - min, eval);

        integrand(grid.value(umin), eval);
        out.mult_add(grid.value(umin + 1) - min, eval);

        loop {
            umin += 1;
            if umin == max {
                break;
            }
            integrand(grid.value(umin), eval);
            out.mult_add(grid.value(umin + 1) - grid.value(umin - 1), eval);
        }

        integrand(grid.value(umin), eval);
        out.mult_add(grid.value(umin) - grid.value(umin - 1), eval);

        out.scale(0.5);
    } else {
        integrand(min, eval);
        out.add_assign(eval);

        integrand(grid.value(umin), eval);
        out.add_assign(eval);

        out.scale(0.5 * (grid.value(umin) - min));
    }
}

/// Trapezoidal integration from the mesh point `min` up to the off-mesh point
/// `max`, with the irregularity approaching from the right boundary.
pub fn integrate_right_singular<F>(
    grid: &FrequencyGrid,
    min: usize,
    max: f64,
    mut integrand: F,
    eval: &mut ChannelBundle,
    out: &mut ChannelBundle,
) where
    F: FnMut(f64, &mut ChannelBundle),
{
    debug_assert!(grid.value(min) <= max);

    out.reset();
    let mut umin = min;
    let umax = grid.lesser(max);
    if umin != umax {
        integrand(grid.value(umin), eval);
        out.mult_add(grid.value(umin + 1) - grid.value(umin), eval);

        loop {
            umin += 1;
            if umin == umax {
                break;
            }
            integrand(grid.value(umin), eval);
            out.mult_add(grid.value(umin + 1) - grid.value(umin - 1), eval);
        }

        integrand(grid.value(umin), eval);
        out.mult_add(max - grid.value(umin - 1), eval);

        integrand(max, eval);
        out.mult_add(max - grid.value(umin), eval);

        out.scale(0.5);
    } else {
        integrand(max, eval);
        out.add_assign(eval);

        integrand(grid.value(umin), eval);
        out.add_assign(eval);

        out.scale(0.5 * (max - grid.value(umin)));
    }
}

/// Trapezoidal integration between the off-mesh points `min` and `max`, with
/// irregularities approaching from both boundaries.
pub fn integrate_both_singular<F>(
    grid: &FrequencyGrid,
    min: f64,
    max: f64,
    mut integrand: F,
    eval: &mut ChannelBundle,
    out: &mut ChannelBundle,
) where
    F: FnMut(f64, &mut ChannelBundle),
{
    debug_assert!(min <= max);

    out.reset();
    let mut umin = grid.greater(min);
    let umax = grid.lesser(max);
    if umax >= umin {
        integrand(min, eval);
        out.mult_add(grid.value(umin) - min, eval);

        if umax != umin {
            integrand(grid.value(umin), eval);
            out.mult_add(grid.value(umin + 1) - min, eval);

            loop {
                umin += 1;
                if umin == umax {
                    break;
                }
                integrand(grid.value(umin), eval);
                out.mult_add(grid.value(umin + 1) - grid.value(umin - 1), eval);
            }

            integrand(grid.value(umin), eval);
            out.mult_add(max - grid.value(umin - 1), eval);
        } else {
            integrand(grid.value(umin), eval);
            out.mult_add(max - min, eval);
        }

        integrand(max, eval);
        out.mult_add(max - grid.value(umin), eval);

        out.scale(0.5);
    } else {
        integrand(max, eval);
        out.add_assign(eval);

        integrand(min, eval);
        out.add_assign(eval);

        out.scale(0.5 * (max - min));
    }
}

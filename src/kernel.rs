//! Assembly of the correlation integrand.
//!
//! One susceptibility evaluation is a doubly nested frequency integral. The
//! outer integrand at frequency `w` carries a local propagator term plus an
//! inner integral over `wp` of two vertex diagrams: the "dumbbell" (full
//! per-separation bundle contribution) and the "egg" (local combination of
//! the four single-point vertex values), normalized by the four propagator
//! factors. Both integration levels use the same singular-region split around
//! the current flow parameter.

use std::f64::consts::PI;

use crate::bundle::ChannelBundle;
use crate::grid::FrequencyGrid;
use crate::integrate::integrate_singular;
use crate::vertex::{FrequencyChannel, OneParticleVertex, SpinChannel, TwoParticleVertex};

/// Dumbbell weights per channel, in storage order (X, Y, Z, Density).
const DUMBBELL_WEIGHTS: [f64; 4] = [1.0, 1.0, 1.0, 4.0];

/// Reusable scratch bundles for one susceptibility evaluation.
///
/// Sized once from the lattice's reduced separation count; the nested
/// integration threads these buffers through every node, so evaluating a
/// bundle allocates nothing.
pub struct Workspace {
    stack: ChannelBundle,
    inner_eval: ChannelBundle,
    inner_region: ChannelBundle,
    outer_eval: ChannelBundle,
    outer_region: ChannelBundle,
}

impl Workspace {
    pub fn new(width: usize) -> Self {
        Self {
            stack: ChannelBundle::new(width),
            inner_eval: ChannelBundle::new(width),
            inner_region: ChannelBundle::new(width),
            outer_eval: ChannelBundle::new(width),
            outer_region: ChannelBundle::new(width),
        }
    }
}

/// Correlation integrand for one flow parameter value.
pub struct DiagramKernel<'a> {
    cutoff: f64,
    nu: f64,
    grid: &'a FrequencyGrid,
    one_particle: &'a dyn OneParticleVertex,
    two_particle: &'a dyn TwoParticleVertex,
}

impl<'a> DiagramKernel<'a> {
    /// Build a kernel at flow parameter `cutoff` and frequency transfer `nu`.
    pub fn new(
        cutoff: f64,
        nu: f64,
        grid: &'a FrequencyGrid,
        one_particle: &'a dyn OneParticleVertex,
        two_particle: &'a dyn TwoParticleVertex,
    ) -> Self {
        Self {
            cutoff,
            nu,
            grid,
            one_particle,
            two_particle,
        }
    }

    /// Compute the susceptibility bundle for the entire lattice into `out`.
    pub fn susceptibility(&self, workspace: &mut Workspace, out: &mut ChannelBundle) {
        let Workspace {
            stack,
            inner_eval,
            inner_region,
            outer_eval,
            outer_region,
        } = workspace;
        let (cutoff, nu) = (self.cutoff, self.nu);
        let (grid, v2, v4) = (self.grid, self.one_particle, self.two_particle);

        let mut outer = |w: f64, ret: &mut ChannelBundle| {
            ret.reset();

            // Local term, zero-separation slot only.
            let local = 1.0 / ((w + v2.value(w)) * (w + nu + v2.value(w + nu)));
            ret.channel_mut(SpinChannel::X)[0] += local / (4.0 * PI);
            ret.channel_mut(SpinChannel::Y)[0] += local / (4.0 * PI);
            ret.channel_mut(SpinChannel::Z)[0] += local / (4.0 * PI);
            ret.channel_mut(SpinChannel::Density)[0] += local / PI;

            // Vertex term: inner integral over wp.
            let mut inner = |wp: f64, eval: &mut ChannelBundle| {
                eval.reset();
                let s = w + wp + nu;
                let t = nu;
                let u = w - wp;

                v4.value_bundle(s, t, u, stack);

                let vx = v4.value(0, 0, s, u, t, SpinChannel::X, FrequencyChannel::None);
                let vy = v4.value(0, 0, s, u, t, SpinChannel::Y, FrequencyChannel::None);
                let vz = v4.value(0, 0, s, u, t, SpinChannel::Z, FrequencyChannel::None);
                let vd = v4.value(0, 0, s, u, t, SpinChannel::Density, FrequencyChannel::None);

                // Dumbbell diagram, all separations.
                for (channel, weight) in SpinChannel::ALL.into_iter().zip(DUMBBELL_WEIGHTS) {
                    eval.mult_sub_channel(channel, weight, stack);
                }

                // Egg diagram, zero-separation slot.
                eval.channel_mut(SpinChannel::X)[0] += 0.5 * (vx - vy - vz + vd);
                eval.channel_mut(SpinChannel::Y)[0] += 0.5 * (-vx + vy - vz + vd);
                eval.channel_mut(SpinChannel::Z)[0] += 0.5 * (-vx - vy + vz + vd);
                eval.channel_mut(SpinChannel::Density)[0] += 2.0 * (vx + vy + vz + vd);

                let normalization = 1.0
                    / ((w + v2.value(w))
                        * (w + nu + v2.value(w + nu))
                        * (wp + v2.value(wp))
                        * (wp + nu + v2.value(wp + nu))
                        * 4.0
                        * PI
                        * PI);
                eval.scale(normalization);
            };
            integrate_singular(grid, cutoff, nu, &mut inner, inner_eval, inner_region, ret);
        };

        out.reset();
        integrate_singular(grid, cutoff, nu, &mut outer, outer_eval, outer_region, out);
    }
}

//! Shared fixtures for integration tests: a toy chain lattice with a folded
//! symmetry range, analytic vertex functions, and a mutable flow state with
//! call-count instrumentation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spincorr::bundle::ChannelBundle;
use spincorr::context::{CoreContext, FlowState};
use spincorr::grid::FrequencyGrid;
use spincorr::lattice::{Lattice, SymmetryImage};
use spincorr::vertex::{FrequencyChannel, OneParticleVertex, SpinChannel, TwoParticleVertex};

/// One basis site with a four-site symmetry range folding onto three reduced
/// separations: range site 3 is the mirror image of range site 1 and picks up
/// a sign under the transform.
pub struct MirrorChain {
    bravais: Vec<[f64; 3]>,
    basis: Vec<[f64; 3]>,
}

impl Default for MirrorChain {
    fn default() -> Self {
        Self {
            bravais: vec![[1.0, 0.0, 0.0]],
            basis: vec![[0.0, 0.0, 0.0]],
        }
    }
}

impl Lattice for MirrorChain {
    fn basis_count(&self) -> usize {
        1
    }

    fn range_count(&self) -> usize {
        4
    }

    fn reduced_count(&self) -> usize {
        3
    }

    fn bravais_vectors(&self) -> &[[f64; 3]] {
        &self.bravais
    }

    fn basis_positions(&self) -> &[[f64; 3]] {
        &self.basis
    }

    fn site_position(&self, _basis: usize, range: usize) -> [f64; 3] {
        let x = match range {
            0 => 0.0,
            1 => 1.0,
            2 => 2.0,
            _ => -1.0,
        };
        [x, 0.0, 0.0]
    }

    fn symmetry_transform(
        &self,
        _basis: usize,
        range: usize,
        channel: SpinChannel,
    ) -> SymmetryImage {
        let (reduced_index, sign) = match range {
            0 => (0, 1.0),
            1 => (1, 1.0),
            2 => (2, 1.0),
            _ => (1, -1.0),
        };
        SymmetryImage {
            channel,
            reduced_index,
            sign,
        }
    }
}

/// Vanishing one-particle coupling with call counting.
#[derive(Default)]
pub struct ZeroSigma {
    pub calls: AtomicUsize,
}

impl OneParticleVertex for ZeroSigma {
    fn value(&self, _w: f64) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        0.0
    }
}

/// Two-particle coupling with fixed single-point values and a separation- and
/// frequency-decaying bundle, with bundle call counting.
pub struct DecayingVertex {
    pub point: [f64; 4],
    pub amplitude: [f64; 4],
    pub bundle_calls: AtomicUsize,
}

impl DecayingVertex {
    pub fn new(point: [f64; 4], amplitude: [f64; 4]) -> Self {
        Self {
            point,
            amplitude,
            bundle_calls: AtomicUsize::new(0),
        }
    }
}

impl TwoParticleVertex for DecayingVertex {
    fn value(
        &self,
        _i1: usize,
        _i2: usize,
        _w1: f64,
        _w2: f64,
        _w3: f64,
        channel: SpinChannel,
        _frequency_channel: FrequencyChannel,
    ) -> f64 {
        self.point[channel.index()]
    }

    fn value_bundle(&self, s: f64, t: f64, u: f64, out: &mut ChannelBundle) {
        self.bundle_calls.fetch_add(1, Ordering::SeqCst);
        out.reset();
        let envelope = 1.0 / (1.0 + s * s + t * t + u * u);
        for channel in SpinChannel::ALL {
            let amplitude = self.amplitude[channel.index()];
            for (r, value) in out.channel_mut(channel).iter_mut().enumerate() {
                *value = amplitude * envelope / (1.0 + r as f64);
            }
        }
    }
}

/// Externally steered flow state over the fixture vertices.
pub struct TestFlow {
    cutoff: Mutex<f64>,
    pub one: ZeroSigma,
    pub two: DecayingVertex,
}

impl TestFlow {
    pub fn new(cutoff: f64, two: DecayingVertex) -> Self {
        Self {
            cutoff: Mutex::new(cutoff),
            one: ZeroSigma::default(),
            two,
        }
    }

    pub fn set_cutoff(&self, cutoff: f64) {
        *self.cutoff.lock() = cutoff;
    }
}

impl FlowState for TestFlow {
    fn cutoff(&self) -> f64 {
        *self.cutoff.lock()
    }

    fn one_particle(&self) -> &dyn OneParticleVertex {
        &self.one
    }

    fn two_particle(&self) -> &dyn TwoParticleVertex {
        &self.two
    }
}

/// Standard context over the mirror chain and a five-point mesh.
pub fn context(flow: Arc<TestFlow>) -> CoreContext {
    CoreContext::new(
        Arc::new(MirrorChain::default()),
        Arc::new(FrequencyGrid::new(&[0.5, 1.0, 2.0, 4.0, 8.0]).unwrap()),
        flow,
    )
}

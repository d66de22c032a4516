//! Shared context for a measurement run.
//!
//! The lattice, the frequency mesh and the handle to the live flow state are
//! bundled into one explicit context object that is passed to the measurement
//! at construction. No component reaches for globals.

use std::sync::Arc;

use crate::grid::FrequencyGrid;
use crate::lattice::Lattice;
use crate::vertex::{OneParticleVertex, TwoParticleVertex};

/// Read-only view of the externally evolving flow state.
///
/// The flow driver owns the state and advances it between measurements; while
/// a scheduled computation runs, the state must not be mutated.
pub trait FlowState: Send + Sync {
    /// Current value of the flow parameter.
    fn cutoff(&self) -> f64;

    /// One-particle coupling at the current flow parameter.
    fn one_particle(&self) -> &dyn OneParticleVertex;

    /// Two-particle coupling at the current flow parameter.
    fn two_particle(&self) -> &dyn TwoParticleVertex;
}

/// Immutable run context shared by all measurement components.
#[derive(Clone)]
pub struct CoreContext {
    pub lattice: Arc<dyn Lattice>,
    pub frequency: Arc<FrequencyGrid>,
    pub flow: Arc<dyn FlowState>,
}

impl CoreContext {
    pub fn new(
        lattice: Arc<dyn Lattice>,
        frequency: Arc<FrequencyGrid>,
        flow: Arc<dyn FlowState>,
    ) -> Self {
        Self {
            lattice,
            frequency,
            flow,
        }
    }
}

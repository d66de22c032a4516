//! Read-only access to the scale-dependent coupling functions.
//!
//! The coupling functions ("vertices") live in the external flow state and
//! evolve under the flow equations; this core only ever queries them. Both
//! traits must be safe to share across the scheduler's worker threads, and no
//! concurrent mutation of the underlying flow state may occur while a
//! scheduled computation is running.

use crate::bundle::ChannelBundle;

/// Spin channel of a correlation or vertex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinChannel {
    X,
    Y,
    Z,
    Density,
}

impl SpinChannel {
    pub const COUNT: usize = 4;

    /// All channels in storage order.
    pub const ALL: [SpinChannel; 4] = [
        SpinChannel::X,
        SpinChannel::Y,
        SpinChannel::Z,
        SpinChannel::Density,
    ];

    /// Storage index of the channel.
    pub fn index(self) -> usize {
        match self {
            SpinChannel::X => 0,
            SpinChannel::Y => 1,
            SpinChannel::Z => 2,
            SpinChannel::Density => 3,
        }
    }

    /// Observable group name under which this channel is persisted.
    pub fn group_name(self) -> &'static str {
        match self {
            SpinChannel::X => "CorrelationsXX",
            SpinChannel::Y => "CorrelationsYY",
            SpinChannel::Z => "CorrelationsZZ",
            SpinChannel::Density => "CorrelationsDD",
        }
    }
}

/// Frequency channel designation for two-particle vertex queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyChannel {
    S,
    T,
    U,
    None,
}

/// One-particle coupling (self-energy-like function of frequency).
pub trait OneParticleVertex: Send + Sync {
    /// Value of the coupling at frequency `w`.
    fn value(&self, w: f64) -> f64;
}

/// Two-particle coupling (four-point vertex).
///
/// Lattice sites are addressed by reduced (symmetry-inequivalent) index;
/// index 0 is the zero separation.
pub trait TwoParticleVertex: Send + Sync {
    /// Single-point value at sites `(i1, i2)` and frequencies `(w1, w2, w3)`.
    fn value(
        &self,
        i1: usize,
        i2: usize,
        w1: f64,
        w2: f64,
        w3: f64,
        channel: SpinChannel,
        frequency_channel: FrequencyChannel,
    ) -> f64;

    /// Full per-separation bundle for all four channels at the transfer
    /// frequencies `(s, t, u)`, written into `out`.
    fn value_bundle(&self, s: f64, t: f64, u: f64, out: &mut ChannelBundle);
}

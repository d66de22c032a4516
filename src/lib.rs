//! Spincorr: Real-space spin correlation measurements
//!
//! Computes static spin-spin correlation functions (three transverse channels
//! and a density channel) of a lattice spin model from scale-dependent one-
//! and two-particle coupling functions, at successive values of a flow
//! parameter, and persists them to a self-describing binary container.

pub mod bundle;
pub mod config;
pub mod context;
pub mod error;
pub mod grid;
pub mod integrate;
pub mod kernel;
pub mod lattice;
pub mod logging;
pub mod measurement;
pub mod reduce;
pub mod scheduler;
pub mod store;
pub mod vertex;

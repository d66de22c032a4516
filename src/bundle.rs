//! Per-channel value bundles.
//!
//! A [`ChannelBundle`] holds one scalar per symmetry-inequivalent lattice
//! separation for each of the four spin channels. It is the unit the
//! integrator accumulates into, so all arithmetic is in-place and
//! allocation-free: bundles are sized once and threaded through the nested
//! quadrature as scratch buffers.

use crate::vertex::SpinChannel;

/// Four spin channels times `width` scalars, stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBundle {
    width: usize,
    data: Vec<f64>,
}

impl ChannelBundle {
    /// Allocate a zeroed bundle with `width` scalars per channel.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            data: vec![0.0; SpinChannel::COUNT * width],
        }
    }

    /// Number of scalars per channel.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Values of one spin channel.
    pub fn channel(&self, channel: SpinChannel) -> &[f64] {
        let start = channel.index() * self.width;
        &self.data[start..start + self.width]
    }

    /// Mutable values of one spin channel.
    pub fn channel_mut(&mut self, channel: SpinChannel) -> &mut [f64] {
        let start = channel.index() * self.width;
        &mut self.data[start..start + self.width]
    }

    /// Zero every value.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Elementwise `self += rhs`.
    pub fn add_assign(&mut self, rhs: &ChannelBundle) {
        debug_assert_eq!(self.width, rhs.width);
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b;
        }
    }

    /// Fused multiply-add, `self += factor * rhs`.
    pub fn mult_add(&mut self, factor: f64, rhs: &ChannelBundle) {
        debug_assert_eq!(self.width, rhs.width);
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += factor * b;
        }
    }

    /// Per-channel fused multiply-subtract, `self[ch] -= factor * rhs[ch]`.
    pub fn mult_sub_channel(&mut self, channel: SpinChannel, factor: f64, rhs: &ChannelBundle) {
        debug_assert_eq!(self.width, rhs.width);
        let start = channel.index() * self.width;
        for (a, b) in self.data[start..start + self.width]
            .iter_mut()
            .zip(rhs.channel(channel))
        {
            *a -= factor * b;
        }
    }
}

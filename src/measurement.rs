//! Correlation measurement protocol.
//!
//! Registers the scheduler stacks for the four correlation buffers, owns the
//! per-cutoff susceptibility bundle cache, and persists snapshots to the
//! observable store. The driver calls [`CorrelationMeasurement::take_measurement`]
//! whenever the flow parameter changes; recomputation happens at most once
//! per distinct cutoff value, and only the designated master task writes
//! output.

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::sync::Arc;
use tracing::debug;

use crate::bundle::ChannelBundle;
use crate::config::CorrConfig;
use crate::context::CoreContext;
use crate::error::MeasureError;
use crate::kernel::{DiagramKernel, Workspace};
use crate::reduce::SymmetryReducer;
use crate::scheduler::{StackId, StackScheduler};
use crate::store::{GroupMeta, OutputStore};
use crate::vertex::SpinChannel;

/// Susceptibility bundle memoized per flow-parameter value.
///
/// The bundle covers the entire lattice, so it is computed once per distinct
/// cutoff and every scheduler work item only reads its own slice. The write
/// lock makes the computation at-most-once among concurrent workers.
struct BundleCache {
    nu: f64,
    slot: RwLock<Option<(f64, ChannelBundle)>>,
    workspace: Mutex<Workspace>,
}

impl BundleCache {
    fn new(nu: f64, width: usize) -> Self {
        Self {
            nu,
            slot: RwLock::new(None),
            workspace: Mutex::new(Workspace::new(width)),
        }
    }

    fn with_bundle<R>(
        &self,
        cutoff: f64,
        ctx: &CoreContext,
        f: impl FnOnce(&ChannelBundle) -> R,
    ) -> R {
        {
            let guard = self.slot.read();
            if let Some((key, bundle)) = &*guard {
                if *key == cutoff {
                    return f(bundle);
                }
            }
        }

        let mut guard = self.slot.write();
        let valid = matches!(&*guard, Some((key, _)) if *key == cutoff);
        if !valid {
            debug!(cutoff, "recomputing susceptibility bundle");
            let kernel = DiagramKernel::new(
                cutoff,
                self.nu,
                &ctx.frequency,
                ctx.flow.one_particle(),
                ctx.flow.two_particle(),
            );
            let mut out = ChannelBundle::new(ctx.lattice.reduced_count());
            kernel.susceptibility(&mut self.workspace.lock(), &mut out);
            *guard = Some((cutoff, out));
        }

        let guard = RwLockWriteGuard::downgrade(guard);
        match &*guard {
            Some((_, bundle)) => f(bundle),
            None => unreachable!("bundle populated above"),
        }
    }
}

/// Real-space spin-spin correlation measurement.
pub struct CorrelationMeasurement {
    ctx: CoreContext,
    store: OutputStore,
    min_cutoff: f64,
    max_cutoff: f64,
    scheduler: StackScheduler,
    stacks: Vec<StackId>,
    channel_stacks: [StackId; 4],
}

impl CorrelationMeasurement {
    /// Set up the measurement: allocates the four correlation buffers from
    /// the lattice geometry and registers the scheduler stacks.
    pub fn new(ctx: CoreContext, config: &CorrConfig) -> Result<Self, MeasureError> {
        config.validate()?;

        let basis_count = ctx.lattice.basis_count();
        let range_count = ctx.lattice.range_count();
        let buffer_len = basis_count * range_count;
        let cache = Arc::new(BundleCache::new(
            config.frequency_transfer,
            ctx.lattice.reduced_count(),
        ));

        let mut scheduler = StackScheduler::new(config.workers);

        // Scalar stack mirroring the current cutoff; its value is its own
        // cache key.
        let cutoff_stack = {
            let flow = ctx.flow.clone();
            let key_flow = ctx.flow.clone();
            scheduler.add_master_stack(
                1,
                1,
                move |_, out| out[0] = flow.cutoff(),
                move || key_flow.cutoff(),
            )
        };

        let channel_item = |channel: SpinChannel| {
            let ctx = ctx.clone();
            let cache = cache.clone();
            move |index: usize, out: &mut [f64]| {
                let cutoff = ctx.flow.cutoff();
                out[0] = cache.with_bundle(cutoff, &ctx, |bundle| {
                    let reducer = SymmetryReducer::new(ctx.lattice.as_ref());
                    let basis = index / ctx.lattice.range_count();
                    let range = index % ctx.lattice.range_count();
                    reducer.reduced_value(bundle, basis, range, channel)
                });
            }
        };

        // One vector master for XX keyed on the cutoff; YY, ZZ and DD attach
        // as slaves sharing its partition and cache decision.
        let xx_stack = {
            let key_flow = ctx.flow.clone();
            scheduler.add_master_stack(buffer_len, 1, channel_item(SpinChannel::X), move || {
                key_flow.cutoff()
            })
        };
        let yy_stack = scheduler.add_slave_stack(xx_stack, 1, channel_item(SpinChannel::Y))?;
        let zz_stack = scheduler.add_slave_stack(xx_stack, 1, channel_item(SpinChannel::Z))?;
        let dd_stack =
            scheduler.add_slave_stack(xx_stack, 1, channel_item(SpinChannel::Density))?;

        Ok(Self {
            store: OutputStore::new(&config.outfile),
            min_cutoff: config.min_cutoff,
            max_cutoff: config.max_cutoff,
            scheduler,
            stacks: vec![cutoff_stack, xx_stack],
            channel_stacks: [xx_stack, yy_stack, zz_stack, dd_stack],
            ctx,
        })
    }

    /// Perform the measurement at the current flow state.
    ///
    /// Recomputes the correlation buffers only if the cutoff changed since
    /// the last computation; with `is_master_task` set, appends one snapshot
    /// per observable group afterwards.
    pub fn take_measurement(&self, is_master_task: bool) -> Result<(), MeasureError> {
        let cutoff = self.ctx.flow.cutoff();
        if cutoff < self.min_cutoff || cutoff > self.max_cutoff {
            return Ok(());
        }

        self.scheduler.calculate(&self.stacks)?;

        if is_master_task {
            let meta = self.group_meta();
            for (channel, stack) in SpinChannel::ALL.into_iter().zip(self.channel_stacks) {
                let group = channel.group_name();
                if self.store.metadata(group)?.is_none() {
                    self.store.ensure_metadata(group, &meta)?;
                }
                let data = self.scheduler.with_values(stack, |v| v.to_vec())?;
                self.store.append_snapshot(group, cutoff, &data)?;
            }
        }
        Ok(())
    }

    /// Correlation buffer of one channel, in flat enumeration order.
    pub fn correlations(&self, channel: SpinChannel) -> Result<Vec<f64>, MeasureError> {
        self.scheduler
            .with_values(self.channel_stacks[channel.index()], |v| v.to_vec())
    }

    /// The observable store this measurement writes to.
    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn min_cutoff(&self) -> f64 {
        self.min_cutoff
    }

    pub fn max_cutoff(&self) -> f64 {
        self.max_cutoff
    }

    fn group_meta(&self) -> GroupMeta {
        let lattice = &self.ctx.lattice;
        let basis_count = lattice.basis_count();
        let range_count = lattice.range_count();
        let mut sites = Vec::with_capacity(basis_count * range_count);
        for basis in 0..basis_count {
            for range in 0..range_count {
                sites.push(lattice.site_position(basis, range));
            }
        }
        GroupMeta {
            lattice_vectors: lattice.bravais_vectors().to_vec(),
            basis: lattice.basis_positions().to_vec(),
            sites,
            basis_count,
            range_count,
        }
    }
}

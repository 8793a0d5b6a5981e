//! # Sparse knot evaluation
//!
//! Full per-step propagation for every object is the dominant cost of a
//! screening cycle. [`KnotCache::build`] evaluates each object's position
//! only at stride-spaced "knot" steps; the dense
//! [`PositionCache`](crate::propagation::position_cache::PositionCache) is
//! then filled by linear interpolation between knots, trading a small,
//! bounded position error for an order-of-magnitude reduction in propagator
//! calls.
//!
//! Knot evaluation runs in parallel across objects. Every worker builds its
//! own propagator and writes into a disjoint slice of the output buffers, so
//! no synchronization is needed. A failed evaluation marks the knot invalid
//! (`f32::NAN`) and stops that object's sequence: a bad orbital state
//! generally stays bad.

use std::sync::Arc;

use ahash::RandomState;
use hifitime::{Duration, Epoch};
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::catalog::ScanObject;
use crate::config::ScreeningConfig;
use crate::constants::{NoradId, M_PER_KM};
use crate::propagation::{Propagator, PropagatorProvider};

/// Per-object sparse position samples at stride-spaced step indices, one
/// flat `num_objects x num_knots` buffer per axis, kilometers. `f32::NAN`
/// marks a knot that was never evaluated or failed to evaluate.
pub struct KnotCache {
    pub(crate) index_of: HashMap<NoradId, usize, RandomState>,
    pub(crate) norad_ids: Vec<NoradId>,
    /// One absolute timestamp per step of the full window (not per knot);
    /// knot `k` samples `times[k * stride]`.
    pub(crate) times: Vec<Epoch>,
    pub(crate) step_seconds: u32,
    pub(crate) stride: usize,
    pub(crate) num_knots: usize,
    pub(crate) x: Vec<f32>,
    pub(crate) y: Vec<f32>,
    pub(crate) z: Vec<f32>,
}

impl KnotCache {
    /// Evaluate knot positions for every object of the snapshot.
    ///
    /// Arguments
    /// -----------------
    /// * `objects`: catalog snapshot; dense index `i` refers to `objects[i]`.
    /// * `provider`: builds one exclusively-owned propagator per worker.
    /// * `start_time`: absolute time of step 0.
    /// * `config`: validated screening parameters.
    ///
    /// Return
    /// ----------
    /// * A [`KnotCache`] covering `config.total_steps()` steps. Objects whose
    ///   element set is rejected, or whose evaluation fails partway, keep NaN
    ///   knots from the point of failure on; they are excluded from derived
    ///   steps rather than surfaced as errors.
    pub fn build<P: PropagatorProvider>(
        objects: &[Arc<ScanObject>],
        provider: &P,
        start_time: Epoch,
        config: &ScreeningConfig,
    ) -> KnotCache {
        let total_steps = config.total_steps();
        let stride = config.interpolation_stride;
        let num_knots = (total_steps - 1) / stride + 1;
        let num_objects = objects.len();

        let times: Vec<Epoch> = (0..total_steps)
            .map(|i| start_time + Duration::from_seconds((i as u64 * config.step_seconds as u64) as f64))
            .collect();

        let mut index_of: HashMap<NoradId, usize, RandomState> =
            HashMap::with_capacity_and_hasher(num_objects, RandomState::new());
        let mut norad_ids = Vec::with_capacity(num_objects);
        for (i, object) in objects.iter().enumerate() {
            index_of.insert(object.norad_id, i);
            norad_ids.push(object.norad_id);
        }

        // Invalid until proven otherwise
        let mut x = vec![f32::NAN; num_objects * num_knots];
        let mut y = vec![f32::NAN; num_objects * num_knots];
        let mut z = vec![f32::NAN; num_objects * num_knots];

        x.par_chunks_mut(num_knots)
            .zip(y.par_chunks_mut(num_knots))
            .zip(z.par_chunks_mut(num_knots))
            .enumerate()
            .for_each(|(obj_idx, ((kx, ky), kz))| {
                let object = &objects[obj_idx];
                let mut propagator = match provider.build(object) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("Excluding object {}: {e}", object.norad_id);
                        return;
                    }
                };

                for k in 0..num_knots {
                    let step = k * stride;
                    if step >= total_steps {
                        break;
                    }
                    match propagator.state_at(times[step]) {
                        Ok(state) => {
                            kx[k] = (state.position_m.x / M_PER_KM) as f32;
                            ky[k] = (state.position_m.y / M_PER_KM) as f32;
                            kz[k] = (state.position_m.z / M_PER_KM) as f32;
                        }
                        Err(_) => break, // bad element set
                    }
                }
            });

        KnotCache {
            index_of,
            norad_ids,
            times,
            step_seconds: config.step_seconds,
            stride,
            num_knots,
            x,
            y,
            z,
        }
    }

    pub fn num_objects(&self) -> usize {
        self.norad_ids.len()
    }

    pub fn num_knots(&self) -> usize {
        self.num_knots
    }

    /// True when knot `k` of the object holds a successful evaluation.
    pub fn is_valid(&self, obj: usize, knot: usize) -> bool {
        !self.x[obj * self.num_knots + knot].is_nan()
    }
}

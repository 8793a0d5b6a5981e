//! # Dense interpolated position cache
//!
//! [`PositionCache::from_knots`] expands a
//! [`KnotCache`](crate::propagation::knot_cache::KnotCache) into one
//! position per object per step by linear interpolation between consecutive
//! valid knots. Knot steps carry the raw evaluations unchanged, so cached
//! values at knots are exact, not approximations.
//!
//! Validity is centralized here: a step is usable for an object iff both
//! bracketing knots evaluated successfully ([`PositionCache::is_valid`]).
//! Invalid steps are excluded from every distance computation downstream.
//!
//! Buffers are `f32`: the interpolation error dwarfs single-precision
//! rounding, and the dense cache is by far the largest allocation of a
//! cycle. Distance arithmetic widens to `f64`.

use ahash::RandomState;
use hifitime::Epoch;
use nalgebra::Vector3;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::constants::NoradId;
use crate::propagation::knot_cache::KnotCache;

/// Per-object dense position arrays over the whole lookahead window,
/// kilometers, with the catalog-ID mapping and one timestamp per step.
/// Immutable once built; shared read-only by all scan workers.
pub struct PositionCache {
    index_of: HashMap<NoradId, usize, RandomState>,
    norad_ids: Vec<NoradId>,
    times: Vec<Epoch>,
    step_seconds: u32,
    num_steps: usize,
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
}

impl PositionCache {
    /// Linear interpolation from knot points to full position arrays,
    /// parallel across objects.
    pub fn from_knots(knots: KnotCache) -> PositionCache {
        let num_objects = knots.num_objects();
        let num_steps = knots.times.len();
        let num_knots = knots.num_knots;
        let stride = knots.stride;

        let mut x = vec![f32::NAN; num_objects * num_steps];
        let mut y = vec![f32::NAN; num_objects * num_steps];
        let mut z = vec![f32::NAN; num_objects * num_steps];

        x.par_chunks_mut(num_steps)
            .zip(y.par_chunks_mut(num_steps))
            .zip(z.par_chunks_mut(num_steps))
            .enumerate()
            .for_each(|(obj, ((dx, dy), dz))| {
                let kx = &knots.x[obj * num_knots..(obj + 1) * num_knots];
                let ky = &knots.y[obj * num_knots..(obj + 1) * num_knots];
                let kz = &knots.z[obj * num_knots..(obj + 1) * num_knots];

                for k in 0..num_knots.saturating_sub(1) {
                    if kx[k].is_nan() || kx[k + 1].is_nan() {
                        continue;
                    }

                    let step_start = k * stride;
                    let step_end = ((k + 1) * stride).min(num_steps - 1);

                    dx[step_start] = kx[k];
                    dy[step_start] = ky[k];
                    dz[step_start] = kz[k];

                    dx[step_end] = kx[k + 1];
                    dy[step_end] = ky[k + 1];
                    dz[step_end] = kz[k + 1];

                    for step in step_start + 1..step_end {
                        let t = (step - step_start) as f32 / (step_end - step_start) as f32;
                        dx[step] = kx[k] + t * (kx[k + 1] - kx[k]);
                        dy[step] = ky[k] + t * (ky[k + 1] - ky[k]);
                        dz[step] = kz[k] + t * (kz[k + 1] - kz[k]);
                    }
                }
            });

        PositionCache {
            index_of: knots.index_of,
            norad_ids: knots.norad_ids,
            times: knots.times,
            step_seconds: knots.step_seconds,
            num_steps,
            x,
            y,
            z,
        }
    }

    pub fn num_objects(&self) -> usize {
        self.norad_ids.len()
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Absolute timestamp of every step.
    pub fn times(&self) -> &[Epoch] {
        &self.times
    }

    pub fn step_seconds(&self) -> u32 {
        self.step_seconds
    }

    /// Dense array index of a catalog ID.
    pub fn index_of(&self, norad_id: NoradId) -> Option<usize> {
        self.index_of.get(&norad_id).copied()
    }

    /// Catalog ID at a dense array index.
    pub fn norad_id_at(&self, obj: usize) -> NoradId {
        self.norad_ids[obj]
    }

    /// True when the object's position at this step derives from two
    /// successfully evaluated knots.
    pub fn is_valid(&self, obj: usize, step: usize) -> bool {
        !self.x[obj * self.num_steps + step].is_nan()
    }

    /// Cached position in kilometers. Only meaningful when
    /// [`is_valid`](Self::is_valid) holds.
    pub fn position_km(&self, obj: usize, step: usize) -> Vector3<f64> {
        let i = obj * self.num_steps + step;
        Vector3::new(
            f64::from(self.x[i]),
            f64::from(self.y[i]),
            f64::from(self.z[i]),
        )
    }

    /// Squared separation of two objects at a step, km^2.
    pub fn distance_squared_at(&self, a: usize, b: usize, step: usize) -> f64 {
        let i = a * self.num_steps + step;
        let j = b * self.num_steps + step;
        let dx = f64::from(self.x[i] - self.x[j]);
        let dy = f64::from(self.y[i] - self.y[j]);
        let dz = f64::from(self.z[i] - self.z[j]);
        dx * dx + dy * dy + dz * dz
    }
}

//! # Close-approach scanning
//!
//! The scanner drives the screening window in three passes:
//!
//! 1. **Coarse detection** ([`check_pairs`]) - every time step, in parallel,
//!    is screened with a [`SpatialGrid`] built over that step's valid
//!    positions; candidate pairs closer than the coarse tolerance become
//!    [`CoarseDetection`]s.
//! 2. **Clustering and reduction** ([`group_and_reduce`]) - detections of
//!    the same pair within 3 steps of each other belong to one orbital
//!    pass; only the closest detection of each pass survives.
//! 3. **Refinement** ([`refine_detection`]) - the closest approach around a
//!    representative detection is located analytically on the interpolated
//!    trajectories, then confirmed with exactly one precise propagator
//!    evaluation per object.

pub mod scanner;
pub mod spatial_grid;

pub use scanner::{check_pairs, group_and_reduce, refine_detection};
pub use spatial_grid::SpatialGrid;

use hifitime::Epoch;

use crate::catalog::ObjectPair;
use crate::constants::{Kilometer, MeterPerSecond};
use crate::propagation::OrbitState;

/// One time-step sample where two objects are closer than the coarse
/// screening tolerance.
#[derive(Debug, Clone)]
pub struct CoarseDetection {
    pub pair: ObjectPair,
    /// Squared separation at the sampled step, km^2.
    pub distance_sq_km2: f64,
    pub step: usize,
}

/// A refined approach event: closest-approach geometry from one precise
/// propagator evaluation of both objects at the analytically located TCA.
/// States follow the pair's canonical order.
#[derive(Debug, Clone)]
pub struct RefinedEvent {
    pub pair: ObjectPair,
    pub distance_km: Kilometer,
    pub tca: Epoch,
    pub relative_velocity_m_s: MeterPerSecond,
    pub state_a: OrbitState,
    pub state_b: OrbitState,
}

//! # Orbit propagation seam and position caching
//!
//! The screening core treats orbit propagation as a black-box capability:
//! given an object's mean elements and an absolute time, produce an inertial
//! position/velocity. This module defines that seam and the two-stage
//! position cache built on top of it:
//!
//! 1. [`Propagator`] / [`PropagatorProvider`] - the capability itself. A
//!    provider builds one propagator per object so that **every concurrent
//!    worker owns its instance exclusively**; the underlying numerical state
//!    is mutable and is never shared across threads.
//! 2. [`KnotCache`](knot_cache::KnotCache) - sparse, stride-spaced
//!    evaluations of every object's position over the lookahead window.
//! 3. [`PositionCache`](position_cache::PositionCache) - dense per-step
//!    positions obtained by linear interpolation between knots, with a
//!    centralized validity query.
//!
//! The default element-set propagator is SGP4 via the `satkit` crate
//! ([`SgpPropagatorProvider`]); tests substitute synthetic implementations.

pub mod knot_cache;
pub mod position_cache;
mod sgp4;

pub use sgp4::{SgpPropagator, SgpPropagatorProvider};

use nalgebra::Vector3;

use hifitime::Epoch;

use crate::catalog::ScanObject;
use crate::constants::M_PER_KM;
use crate::screening_errors::ScreeningError;

/// Inertial position/velocity of one object at one instant.
///
/// Positions are meters and velocities meters per second, in the
/// propagator's inertial frame (TEME for the SGP4 implementation). Both
/// members of a pair must come from the same provider so their frames agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub position_m: Vector3<f64>,
    pub velocity_m_s: Vector3<f64>,
}

impl OrbitState {
    /// Separation from `other` in kilometers.
    pub fn distance_km(&self, other: &OrbitState) -> f64 {
        (self.position_m - other.position_m).norm() / M_PER_KM
    }

    /// Relative speed with respect to `other` in meters per second.
    pub fn relative_speed_m_s(&self, other: &OrbitState) -> f64 {
        (self.velocity_m_s - other.velocity_m_s).norm()
    }
}

/// Evaluates one object's orbital state at arbitrary instants.
///
/// Takes `&mut self`: propagators may hold mutable internal integrator
/// state. Evaluation may fail for degenerate element sets; the caller
/// recovers locally (the object drops out of the affected steps).
pub trait Propagator {
    fn state_at(&mut self, epoch: Epoch) -> Result<OrbitState, ScreeningError>;
}

/// Builds a fresh, exclusively-owned [`Propagator`] for a catalog object.
///
/// Construction itself may fail (unparsable element set); such objects are
/// excluded from the cycle without aborting it.
pub trait PropagatorProvider: Sync {
    type Output: Propagator;

    fn build(&self, object: &ScanObject) -> Result<Self::Output, ScreeningError>;
}

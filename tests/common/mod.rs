//! Shared helpers for integration tests: a deterministic straight-line
//! propagator and in-memory collaborator implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use hifitime::Epoch;
use nalgebra::Vector3;

use skywatch::{
    CatalogProvider, Conjunction, ConjunctionStore, ObjectType, OrbitState, Propagator,
    PropagatorProvider, ScanObject, ScreeningError,
};

/// Straight-line motion description for one synthetic object.
#[derive(Debug, Clone, Copy)]
pub struct LinearTrajectory {
    pub origin_m: Vector3<f64>,
    pub velocity_m_s: Vector3<f64>,
}

pub struct LinearPropagator {
    trajectory: LinearTrajectory,
    start: Epoch,
}

impl Propagator for LinearPropagator {
    fn state_at(&mut self, epoch: Epoch) -> Result<OrbitState, ScreeningError> {
        let dt = (epoch - self.start).to_seconds();
        Ok(OrbitState {
            position_m: self.trajectory.origin_m + self.trajectory.velocity_m_s * dt,
            velocity_m_s: self.trajectory.velocity_m_s,
        })
    }
}

/// Provider mapping catalog IDs to crafted trajectories.
pub struct LinearProvider {
    pub start: Epoch,
    pub trajectories: HashMap<u32, LinearTrajectory>,
}

impl PropagatorProvider for LinearProvider {
    type Output = LinearPropagator;

    fn build(&self, object: &ScanObject) -> Result<LinearPropagator, ScreeningError> {
        let trajectory = self.trajectories.get(&object.norad_id).copied().ok_or(
            ScreeningError::ElementSetRejected {
                norad_id: object.norad_id,
                reason: "no synthetic trajectory".into(),
            },
        )?;
        Ok(LinearPropagator {
            trajectory,
            start: self.start,
        })
    }
}

pub fn scan_object(norad_id: u32, epoch: Epoch) -> ScanObject {
    ScanObject {
        norad_id,
        tle_line1: String::new(),
        tle_line2: String::new(),
        epoch,
        perigee_km: Some(500.0),
        object_type: ObjectType::Payload,
    }
}

/// Catalog provider over a fixed snapshot.
pub struct VecCatalog(pub Vec<ScanObject>);

impl CatalogProvider for VecCatalog {
    fn snapshot(&self) -> Result<Vec<ScanObject>, ScreeningError> {
        Ok(self.0.clone())
    }
}

pub struct FailingCatalog;

impl CatalogProvider for FailingCatalog {
    fn snapshot(&self) -> Result<Vec<ScanObject>, ScreeningError> {
        Err(ScreeningError::Catalog("feed unavailable".into()))
    }
}

/// Store keeping only the latest replacement set, like the real table.
#[derive(Default)]
pub struct MemoryStore {
    pub current: Mutex<Vec<Conjunction>>,
    pub replacements: Mutex<usize>,
}

impl ConjunctionStore for MemoryStore {
    fn replace_all(&self, conjunctions: &[Conjunction]) -> Result<(), ScreeningError> {
        *self.current.lock().unwrap() = conjunctions.to_vec();
        *self.replacements.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct FailingStore;

impl ConjunctionStore for FailingStore {
    fn replace_all(&self, _conjunctions: &[Conjunction]) -> Result<(), ScreeningError> {
        Err(ScreeningError::Persistence("database down".into()))
    }
}

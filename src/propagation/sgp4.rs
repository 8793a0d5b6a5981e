//! SGP4 propagation backed by satkit.

use hifitime::Epoch;
use nalgebra::Vector3;
use satkit::sgp4::sgp4;

use crate::catalog::ScanObject;
use crate::propagation::{OrbitState, Propagator, PropagatorProvider};
use crate::screening_errors::ScreeningError;

/// Default [`PropagatorProvider`]: parses each object's TLE lines into an
/// SGP4 propagator. States are TEME, meters and meters per second.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgpPropagatorProvider;

impl PropagatorProvider for SgpPropagatorProvider {
    type Output = SgpPropagator;

    fn build(&self, object: &ScanObject) -> Result<SgpPropagator, ScreeningError> {
        let tle = satkit::TLE::load_2line(&object.tle_line1, &object.tle_line2).map_err(|e| {
            ScreeningError::ElementSetRejected {
                norad_id: object.norad_id,
                reason: e.to_string(),
            }
        })?;
        Ok(SgpPropagator { tle })
    }
}

/// One object's SGP4 propagator. The TLE holds mutable integrator state, so
/// an instance must stay owned by a single worker.
pub struct SgpPropagator {
    tle: satkit::TLE,
}

impl Propagator for SgpPropagator {
    fn state_at(&mut self, epoch: Epoch) -> Result<OrbitState, ScreeningError> {
        let instant = to_instant(epoch)?;

        match sgp4(&mut self.tle, &[instant]) {
            Ok(result) => {
                let pos = result.pos.column(0);
                let vel = result.vel.column(0);
                Ok(OrbitState {
                    position_m: Vector3::new(pos[0], pos[1], pos[2]),
                    velocity_m_s: Vector3::new(vel[0], vel[1], vel[2]),
                })
            }
            Err(e) => Err(ScreeningError::Propagation(format!(
                "SGP4 evaluation failed: {e:?}"
            ))),
        }
    }
}

fn to_instant(epoch: Epoch) -> Result<satkit::Instant, ScreeningError> {
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    let seconds = f64::from(second) + f64::from(nanos) * 1e-9;
    satkit::Instant::from_datetime(
        year,
        i32::from(month),
        i32::from(day),
        i32::from(hour),
        i32::from(minute),
        seconds,
    )
    .map_err(|e| ScreeningError::Propagation(format!("invalid epoch {epoch}: {e:?}")))
}

//! # Collision probability estimation
//!
//! Turns a [`RefinedEvent`] into a [`Conjunction`] with a probability of
//! collision in `[0, 1]`.
//!
//! The covariance is synthesized, not measured: a diagonal
//! radial/along-track/cross-track position uncertainty grown linearly with
//! element-set age, from empirical SGP4 accuracy figures, with separate
//! constants below and above 2000 km perigee altitude. Suitable for
//! screening-level triage only; the constants are design choices carried
//! from an empirical study, not derivable from first principles, and they
//! do not generalize beyond this use.
//!
//! The probability itself is the standard short-term-encounter reduction:
//! project the combined covariance onto the plane normal to the relative
//! velocity, diagonalize, and integrate the resulting 2D Gaussian over the
//! combined hard-body disc with Chan's equivalent-Rician series. Valid when
//! the encounter is brief relative to the orbital period, which the
//! relative-velocity gate enforces.

use log::debug;
use nalgebra::{Matrix3, Matrix6, Vector3};

use crate::catalog::{ObjectType, ScanObject};
use crate::conjunction::Conjunction;
use crate::constants::SECONDS_PER_DAY;
use crate::propagation::OrbitState;
use crate::scan::RefinedEvent;
use crate::screening_errors::ScreeningError;
use hifitime::Epoch;

// Assumed hard-body radii by catalog classification (m).
const RADIUS_PAYLOAD_M: f64 = 5.0;
const RADIUS_ROCKET_BODY_M: f64 = 5.0;
const RADIUS_DEBRIS_M: f64 = 0.5;
const RADIUS_UNKNOWN_M: f64 = 1.0;

// SGP4 1-sigma position uncertainty (m). Aida & Kirschner (2013) Table 1.
// Growth rates: (6-7d value - epoch value) / 6.5d. Cross-track stays flat.

// LEO (<2000 km)
const LEO_RADIAL_BASE_M: f64 = 176.0;
const LEO_INTRACK_BASE_M: f64 = 695.0;
const LEO_CROSSTRACK_BASE_M: f64 = 168.0;
const LEO_RADIAL_GROWTH_M_PER_DAY: f64 = 125.0;
const LEO_INTRACK_GROWTH_M_PER_DAY: f64 = 392.0;

// Higher orbits (>2000 km) - extrapolated 2x base, 0.5x growth
const HIGH_RADIAL_BASE_M: f64 = LEO_RADIAL_BASE_M * 2.0;
const HIGH_INTRACK_BASE_M: f64 = LEO_INTRACK_BASE_M * 2.0;
const HIGH_CROSSTRACK_BASE_M: f64 = LEO_CROSSTRACK_BASE_M * 2.0;
const HIGH_RADIAL_GROWTH_M_PER_DAY: f64 = LEO_RADIAL_GROWTH_M_PER_DAY * 0.5;
const HIGH_INTRACK_GROWTH_M_PER_DAY: f64 = LEO_INTRACK_GROWTH_M_PER_DAY * 0.5;

const LEO_ALTITUDE_THRESHOLD_KM: f64 = 2000.0;

/// Assumed when the catalog carries no perigee altitude.
const DEFAULT_PERIGEE_KM: f64 = 500.0;

/// Velocity variance placeholder (m^2/s^2); rides along in the 6x6 state
/// covariance but does not enter the 2D projection.
const VELOCITY_VARIANCE_M2_S2: f64 = 1e-6;

/// Below this relative speed the short-term-encounter model is meaningless
/// (co-orbiting or formation-flying objects); the probability is 0.
const MIN_RELATIVE_VELOCITY_M_S: f64 = 10.0;

/// Relative series truncation tolerance for the Chan expansion.
const PC_SERIES_TOL: f64 = 1e-15;
const PC_MAX_TERMS: usize = 10_000;

/// Compute the collision probability of a refined event and build the final
/// [`Conjunction`].
///
/// Probability failures (degenerate geometry, singular covariance) are
/// recovered locally: the event keeps a probability of 0 rather than
/// failing the batch. Output IDs are ordered ascending regardless of scan
/// order.
pub fn probability_and_build(event: &RefinedEvent) -> Conjunction {
    let (id_a, id_b) = event.pair.ids();

    let mut pc = 0.0;
    if event.relative_velocity_m_s > MIN_RELATIVE_VELOCITY_M_S {
        match compute_pc(event) {
            Ok(value) => pc = value,
            Err(e) => debug!("Pc computation failed for pair ({id_a}, {id_b}): {e}"),
        }
    }

    Conjunction::new(
        id_a,
        id_b,
        event.distance_km,
        event.tca,
        event.relative_velocity_m_s,
        pc,
    )
}

fn compute_pc(event: &RefinedEvent) -> Result<f64, ScreeningError> {
    let cov_a = build_covariance(event.pair.a(), element_age_days(event.pair.a().epoch, event.tca));
    let cov_b = build_covariance(event.pair.b(), element_age_days(event.pair.b().epoch, event.tca));

    let combined_position_cov = inertial_position_covariance(&event.state_a, &cov_a)?
        + inertial_position_covariance(&event.state_b, &cov_b)?;

    let combined_radius_m =
        estimate_radius(event.pair.a().object_type) + estimate_radius(event.pair.b().object_type);

    let rel_position_m = event.state_a.position_m - event.state_b.position_m;
    let rel_velocity_m_s = event.state_a.velocity_m_s - event.state_b.velocity_m_s;

    let pc = encounter_plane_pc(
        &rel_position_m,
        &rel_velocity_m_s,
        &combined_position_cov,
        combined_radius_m,
    )?;

    Ok(pc.clamp(0.0, 1.0))
}

/// Diagonal state covariance in the radial/along-track/cross-track frame,
/// grown linearly with element-set age.
fn build_covariance(object: &ScanObject, element_age_days: f64) -> Matrix6<f64> {
    let altitude_km = object.perigee_km.unwrap_or(DEFAULT_PERIGEE_KM);
    let is_leo = altitude_km < LEO_ALTITUDE_THRESHOLD_KM;

    let (radial_base, intrack_base, crosstrack_base, radial_growth, intrack_growth) = if is_leo {
        (
            LEO_RADIAL_BASE_M,
            LEO_INTRACK_BASE_M,
            LEO_CROSSTRACK_BASE_M,
            LEO_RADIAL_GROWTH_M_PER_DAY,
            LEO_INTRACK_GROWTH_M_PER_DAY,
        )
    } else {
        (
            HIGH_RADIAL_BASE_M,
            HIGH_INTRACK_BASE_M,
            HIGH_CROSSTRACK_BASE_M,
            HIGH_RADIAL_GROWTH_M_PER_DAY,
            HIGH_INTRACK_GROWTH_M_PER_DAY,
        )
    };

    let sig_r = radial_base + radial_growth * element_age_days;
    let sig_t = intrack_base + intrack_growth * element_age_days;
    let sig_w = crosstrack_base; // flat per Aida Table 1

    let mut cov = Matrix6::zeros();
    cov[(0, 0)] = sig_r * sig_r;
    cov[(1, 1)] = sig_t * sig_t;
    cov[(2, 2)] = sig_w * sig_w;
    cov[(3, 3)] = VELOCITY_VARIANCE_M2_S2;
    cov[(4, 4)] = VELOCITY_VARIANCE_M2_S2;
    cov[(5, 5)] = VELOCITY_VARIANCE_M2_S2;
    cov
}

fn element_age_days(epoch: Epoch, tca: Epoch) -> f64 {
    ((tca - epoch).to_seconds() / SECONDS_PER_DAY).max(0.0)
}

fn estimate_radius(object_type: ObjectType) -> f64 {
    match object_type {
        ObjectType::Payload => RADIUS_PAYLOAD_M,
        ObjectType::RocketBody => RADIUS_ROCKET_BODY_M,
        ObjectType::Debris => RADIUS_DEBRIS_M,
        ObjectType::Unknown => RADIUS_UNKNOWN_M,
    }
}

/// Rotate the position block of a QSW-frame covariance into the inertial
/// frame using the object's state at TCA.
fn inertial_position_covariance(
    state: &OrbitState,
    qsw_covariance: &Matrix6<f64>,
) -> Result<Matrix3<f64>, ScreeningError> {
    let radial = state
        .position_m
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| ScreeningError::DegenerateEncounter("zero position vector".into()))?;
    let cross = state
        .position_m
        .cross(&state.velocity_m_s)
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| ScreeningError::DegenerateEncounter("degenerate orbital plane".into()))?;
    let along = cross.cross(&radial);

    let rotation = Matrix3::from_columns(&[radial, along, cross]);
    let position_block = qsw_covariance.fixed_view::<3, 3>(0, 0).into_owned();
    Ok(rotation * position_block * rotation.transpose())
}

/// Project onto the encounter plane and integrate the 2D Gaussian over the
/// hard-body disc.
fn encounter_plane_pc(
    rel_position_m: &Vector3<f64>,
    rel_velocity_m_s: &Vector3<f64>,
    combined_cov: &Matrix3<f64>,
    combined_radius_m: f64,
) -> Result<f64, ScreeningError> {
    let along = rel_velocity_m_s
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| ScreeningError::DegenerateEncounter("zero relative velocity".into()))?;

    let in_plane = rel_position_m - along * rel_position_m.dot(&along);
    let e1 = in_plane.try_normalize(f64::EPSILON).ok_or_else(|| {
        ScreeningError::DegenerateEncounter("miss vector parallel to relative velocity".into())
    })?;
    let e2 = along.cross(&e1);

    let pxx = e1.dot(&(combined_cov * e1));
    let pxy = e1.dot(&(combined_cov * e2));
    let pyy = e2.dot(&(combined_cov * e2));

    let xm = rel_position_m.dot(&e1);
    let ym = rel_position_m.dot(&e2); // zero by construction of e1

    // Principal axes of the projected 2x2 covariance
    let theta = 0.5 * (2.0 * pxy).atan2(pxx - pyy);
    let (sin_t, cos_t) = theta.sin_cos();
    let var_x = cos_t * cos_t * pxx + 2.0 * sin_t * cos_t * pxy + sin_t * sin_t * pyy;
    let var_y = sin_t * sin_t * pxx - 2.0 * sin_t * cos_t * pxy + cos_t * cos_t * pyy;

    if !(var_x > 0.0) || !(var_y > 0.0) {
        return Err(ScreeningError::SingularCovariance);
    }

    let x = cos_t * xm + sin_t * ym;
    let y = -sin_t * xm + cos_t * ym;

    Ok(chan_series(
        x,
        y,
        var_x.sqrt(),
        var_y.sqrt(),
        combined_radius_m,
    ))
}

/// Chan's equivalent-Rician series for the probability mass of a 2D
/// Gaussian over a disc of radius `radius` centered `(x, y)` away:
///
/// ```text
/// u = R^2 / (sx * sy)            v = (x/sx)^2 + (y/sy)^2
/// Pc = sum_{m>=0} e^{-v/2} (v/2)^m / m! * (1 - e^{-u/2} sum_{k<=m} (u/2)^k / k!)
/// ```
///
/// Terms are accumulated until they stop contributing relative to
/// `PC_SERIES_TOL`, past the Poisson mode.
fn chan_series(x: f64, y: f64, sigma_x: f64, sigma_y: f64, radius: f64) -> f64 {
    let u = radius * radius / (sigma_x * sigma_y);
    let v = (x / sigma_x).powi(2) + (y / sigma_y).powi(2);

    let half_u = 0.5 * u;
    let half_v = 0.5 * v;

    // e^{-v/2} underflows for extreme miss ratios; the probability is zero
    // at f64 resolution
    let mut poisson = (-half_v).exp();
    if poisson == 0.0 {
        return 0.0;
    }

    // inner_m = e^{-u/2} * sum_{k<=m} (u/2)^k / k!
    let mut u_term = (-half_u).exp();
    let mut inner = u_term;

    let mut pc = 0.0;
    for m in 0..PC_MAX_TERMS {
        let contribution = poisson * (1.0 - inner);
        pc += contribution;

        if m as f64 > half_v && contribution <= PC_SERIES_TOL * pc {
            break;
        }

        let next = m as f64 + 1.0;
        poisson *= half_v / next;
        u_term *= half_u / next;
        inner += u_term;
    }

    pc.clamp(0.0, 1.0)
}

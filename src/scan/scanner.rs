//! Coarse sweep, event clustering, and analytical TCA refinement.

use hifitime::Duration;
use log::warn;
use rayon::prelude::*;
use std::sync::Arc;

use crate::catalog::{ObjectPair, ScanObject};
use crate::config::ScreeningConfig;
use crate::propagation::position_cache::PositionCache;
use crate::propagation::{Propagator, PropagatorProvider};
use crate::scan::spatial_grid::SpatialGrid;
use crate::scan::{CoarseDetection, RefinedEvent};

/// Detections whose step indices are within this many steps of each other
/// belong to the same orbital pass.
const MAX_EVENT_GAP_STEPS: usize = 3;

/// Check for close approaches at every step using spatial indexing only,
/// no pair pre-filter. Parallel across time steps; each step builds its own
/// grid over the read-only cache.
///
/// Arguments
/// -----------------
/// * `objects`: catalog snapshot; must be the slice the cache was built
///   from, so dense indices agree.
/// * `cache`: interpolated positions for the whole window.
/// * `config`: supplies `tolerance_km` and `cell_size_km`.
///
/// Return
/// ----------
/// * All [`CoarseDetection`]s under the coarse tolerance, in no particular
///   order.
pub fn check_pairs(
    objects: &[Arc<ScanObject>],
    cache: &PositionCache,
    config: &ScreeningConfig,
) -> Vec<CoarseDetection> {
    let tol_sq = config.tolerance_km * config.tolerance_km;

    (0..cache.num_steps())
        .into_par_iter()
        .flat_map_iter(|step| {
            let grid = SpatialGrid::at_step(cache, step, config.cell_size_km);
            let mut detections = Vec::new();
            grid.for_each_candidate_pair(|idx_a, idx_b| {
                let dist_sq = cache.distance_squared_at(idx_a as usize, idx_b as usize, step);
                if dist_sq < tol_sq {
                    let pair = ObjectPair::new(
                        objects[idx_a as usize].clone(),
                        objects[idx_b as usize].clone(),
                    );
                    detections.push(CoarseDetection {
                        pair,
                        distance_sq_km2: dist_sq,
                        step,
                    });
                }
            });
            detections
        })
        .collect()
}

/// Cluster detections into events and reduce each event to its closest
/// detection in a single pass.
///
/// Detections are sorted by `(pair, step)`; a run of same-pair detections
/// with inter-step gaps of at most 3 is one event (one orbital pass), and
/// only the smallest-distance detection of the run is retained. Full
/// per-event lists are never materialized.
pub fn group_and_reduce(mut detections: Vec<CoarseDetection>) -> Vec<CoarseDetection> {
    detections.par_sort_unstable_by(|l, r| l.pair.cmp(&r.pair).then(l.step.cmp(&r.step)));

    let mut representatives = Vec::new();
    // (best detection of the current event, last step seen)
    let mut current: Option<(CoarseDetection, usize)> = None;

    for detection in detections {
        let extends_current = current.as_ref().is_some_and(|(best, last_step)| {
            detection.pair == best.pair && detection.step - last_step <= MAX_EVENT_GAP_STEPS
        });

        if extends_current {
            let (best, last_step) = current.as_mut().unwrap();
            *last_step = detection.step;
            if detection.distance_sq_km2 < best.distance_sq_km2 {
                *best = detection;
            }
        } else {
            if let Some((best, _)) = current.take() {
                representatives.push(best);
            }
            let step = detection.step;
            current = Some((detection, step));
        }
    }
    if let Some((best, _)) = current {
        representatives.push(best);
    }

    representatives
}

/// Refine an event's representative detection into a precise closest
/// approach.
///
/// Within each bracketing interpolation interval the squared distance
/// between the two linear trajectories is an exact quadratic in the
/// interpolation parameter; the minimum is solved in closed form and the
/// better interval wins. Events whose analytical minimum already exceeds
/// the collision threshold are dropped before any propagator work. The
/// survivors get exactly one precise evaluation per object at the located
/// TCA; if even the precise distance exceeds the threshold the event is
/// discarded (the interpolated estimate is conservative, not exact).
///
/// Return
/// ----------
/// * `Some(RefinedEvent)` for a confirmed approach under the threshold,
///   `None` otherwise.
pub fn refine_detection<P: PropagatorProvider>(
    detection: &CoarseDetection,
    cache: &PositionCache,
    provider: &P,
    config: &ScreeningConfig,
) -> Option<RefinedEvent> {
    let (id_a, id_b) = detection.pair.ids();
    let idx_a = cache.index_of(id_a)?;
    let idx_b = cache.index_of(id_b)?;

    let step = detection.step;
    let total_steps = cache.num_steps();
    let threshold_sq = config.threshold_km * config.threshold_km;

    let mut best_dist_sq = f64::MAX;
    let mut best_t = 0.0;
    let mut best_interval_start = step;

    let interval_valid = |s0: usize, s1: usize| {
        cache.is_valid(idx_a, s0)
            && cache.is_valid(idx_b, s0)
            && cache.is_valid(idx_a, s1)
            && cache.is_valid(idx_b, s1)
    };

    if step > 0 && interval_valid(step - 1, step) {
        let (dist_sq, t) = analytical_min(cache, idx_a, idx_b, step - 1, step);
        if dist_sq < best_dist_sq {
            best_dist_sq = dist_sq;
            best_t = t;
            best_interval_start = step - 1;
        }
    }

    if step + 1 < total_steps && interval_valid(step, step + 1) {
        let (dist_sq, t) = analytical_min(cache, idx_a, idx_b, step, step + 1);
        if dist_sq < best_dist_sq {
            best_dist_sq = dist_sq;
            best_t = t;
            best_interval_start = step;
        }
    }

    // Most events are spurious noise; the free analytical check gates the
    // expensive propagator calls.
    if best_dist_sq > threshold_sq {
        return None;
    }

    let tca = cache.times()[best_interval_start]
        + Duration::from_seconds(best_t * f64::from(cache.step_seconds()));

    let evaluate = |object: &Arc<ScanObject>| {
        provider
            .build(object)
            .and_then(|mut propagator| propagator.state_at(tca))
    };

    let state_a = match evaluate(detection.pair.a()) {
        Ok(state) => state,
        Err(e) => {
            warn!("Failed to propagate object {id_a} for refinement: {e}");
            return None;
        }
    };
    let state_b = match evaluate(detection.pair.b()) {
        Ok(state) => state,
        Err(e) => {
            warn!("Failed to propagate object {id_b} for refinement: {e}");
            return None;
        }
    };

    let distance_km = state_a.distance_km(&state_b);
    if distance_km > config.threshold_km {
        return None;
    }

    Some(RefinedEvent {
        pair: detection.pair.clone(),
        distance_km,
        tca,
        relative_velocity_m_s: state_a.relative_speed_m_s(&state_b),
        state_a,
        state_b,
    })
}

/// With linear interpolation between two cached positions, squared distance
/// is a quadratic in `t`. Solve for the minimum analytically. Returns
/// `(min_dist_sq, t)` with `t` in `[0, 1]` across the interval `[s0, s1]`.
fn analytical_min(
    cache: &PositionCache,
    idx_a: usize,
    idx_b: usize,
    s0: usize,
    s1: usize,
) -> (f64, f64) {
    let a0 = cache.position_km(idx_a, s0);
    let a1 = cache.position_km(idx_a, s1);
    let b0 = cache.position_km(idx_b, s0);
    let b1 = cache.position_km(idx_b, s1);

    let sep = a0 - b0;
    let delta_sep = (a1 - a0) - (b1 - b0);

    let dist_sq0 = sep.norm_squared();
    let sep_dot_delta = sep.dot(&delta_sep);
    let delta_sep_sq = delta_sep.norm_squared();

    let t = if delta_sep_sq == 0.0 {
        0.5
    } else {
        (-sep_dot_delta / delta_sep_sq).clamp(0.0, 1.0)
    };
    (dist_sq0 + (2.0 * sep_dot_delta + delta_sep_sq * t) * t, t)
}

#[cfg(test)]
mod scanner_test {
    use super::*;
    use crate::catalog::ObjectType;
    use crate::propagation::knot_cache::KnotCache;
    use crate::propagation::OrbitState;
    use crate::screening_errors::ScreeningError;
    use approx::assert_relative_eq;
    use hifitime::Epoch;
    use nalgebra::Vector3;

    fn object(norad_id: u32) -> Arc<ScanObject> {
        Arc::new(ScanObject {
            norad_id,
            tle_line1: String::new(),
            tle_line2: String::new(),
            epoch: Epoch::from_gregorian_utc(2026, 1, 1, 0, 0, 0, 0),
            perigee_km: None,
            object_type: ObjectType::Unknown,
        })
    }

    fn detection(pair: &ObjectPair, dist_sq: f64, step: usize) -> CoarseDetection {
        CoarseDetection {
            pair: pair.clone(),
            distance_sq_km2: dist_sq,
            step,
        }
    }

    #[test]
    fn clustering_splits_on_gap_and_pair_change() {
        let pair_xy = ObjectPair::new(object(1), object(2));
        let pair_xz = ObjectPair::new(object(1), object(3));

        let detections = vec![
            // Pass 1 of (1,2): steps 10..13, closest at step 11
            detection(&pair_xy, 9.0, 10),
            detection(&pair_xy, 4.0, 11),
            detection(&pair_xy, 16.0, 13),
            // Gap of 4 steps: pass 2, closest at step 17
            detection(&pair_xy, 25.0, 17),
            // Other pair, single detection
            detection(&pair_xz, 1.0, 12),
        ];

        let mut events = group_and_reduce(detections);
        events.sort_by(|l, r| l.pair.cmp(&r.pair).then(l.step.cmp(&r.step)));

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].pair, pair_xy);
        assert_eq!(events[0].step, 11);
        assert_relative_eq!(events[0].distance_sq_km2, 4.0);
        assert_eq!(events[1].step, 17);
        assert_eq!(events[2].pair, pair_xz);
    }

    #[test]
    fn clustering_keeps_gap_of_exactly_three() {
        let pair = ObjectPair::new(object(1), object(2));
        let events = group_and_reduce(vec![
            detection(&pair, 9.0, 10),
            detection(&pair, 4.0, 13), // gap of 3: same pass
        ]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step, 13);
    }

    #[test]
    fn clustering_of_empty_input_is_empty() {
        assert!(group_and_reduce(Vec::new()).is_empty());
    }

    // Constant-velocity propagator: the quadratic model is exact, so the
    // closed-form refinement must recover the true minimum.
    struct Linear {
        origin_m: Vector3<f64>,
        velocity_m_s: Vector3<f64>,
        start: Epoch,
    }

    impl Propagator for Linear {
        fn state_at(&mut self, epoch: Epoch) -> Result<OrbitState, ScreeningError> {
            let dt = (epoch - self.start).to_seconds();
            Ok(OrbitState {
                position_m: self.origin_m + self.velocity_m_s * dt,
                velocity_m_s: self.velocity_m_s,
            })
        }
    }

    struct CrossingProvider {
        start: Epoch,
    }

    impl PropagatorProvider for CrossingProvider {
        type Output = Linear;

        // Object 1 sits still at the origin; object 2 crosses the x axis at
        // t = 300 s with a 2 km offset in y, at 100 m/s.
        fn build(&self, object: &ScanObject) -> Result<Linear, ScreeningError> {
            Ok(match object.norad_id {
                1 => Linear {
                    origin_m: Vector3::zeros(),
                    velocity_m_s: Vector3::zeros(),
                    start: self.start,
                },
                _ => Linear {
                    origin_m: Vector3::new(-30_000.0, 2_000.0, 0.0),
                    velocity_m_s: Vector3::new(100.0, 0.0, 0.0),
                    start: self.start,
                },
            })
        }
    }

    #[test]
    fn refinement_recovers_analytic_minimum_for_linear_motion() {
        let start = Epoch::from_gregorian_utc(2026, 1, 1, 0, 0, 0, 0);
        let config = ScreeningConfig::builder()
            .tolerance_km(64.0)
            .threshold_km(5.0)
            .lookahead_hours(1)
            .step_seconds(8)
            .interpolation_stride(24)
            .build()
            .unwrap();
        let provider = CrossingProvider { start };
        let objects = vec![object(1), object(2)];

        let cache =
            PositionCache::from_knots(KnotCache::build(&objects, &provider, start, &config));

        let detections = check_pairs(&objects, &cache, &config);
        assert!(!detections.is_empty());
        let events = group_and_reduce(detections);
        assert_eq!(events.len(), 1);

        let refined = refine_detection(&events[0], &cache, &provider, &config)
            .expect("crossing under threshold must survive refinement");

        // True geometry: minimum separation 2 km at t = 300 s, closing speed
        // 100 m/s. The f32 cache bounds how exactly the quadratic solve can
        // place the vertex.
        assert_relative_eq!(refined.distance_km, 2.0, max_relative = 1e-6);
        assert!(((refined.tca - start).to_seconds() - 300.0).abs() < 1e-3);
        assert_relative_eq!(refined.relative_velocity_m_s, 100.0, max_relative = 1e-12);
    }

    struct ExactProvider {
        start: Epoch,
    }

    impl PropagatorProvider for ExactProvider {
        type Output = Linear;

        // Whole-kilometer positions at every step: exactly representable in
        // the f32 cache, so the quadratic solve sees exact inputs.
        fn build(&self, object: &ScanObject) -> Result<Linear, ScreeningError> {
            Ok(match object.norad_id {
                1 => Linear {
                    origin_m: Vector3::zeros(),
                    velocity_m_s: Vector3::zeros(),
                    start: self.start,
                },
                _ => Linear {
                    origin_m: Vector3::new(-16_000.0, 2_000.0, 0.0),
                    velocity_m_s: Vector3::new(1_000.0, 0.0, 0.0),
                    start: self.start,
                },
            })
        }
    }

    #[test]
    fn refinement_is_exact_on_exactly_representable_inputs() {
        let start = Epoch::from_gregorian_utc(2026, 1, 1, 0, 0, 0, 0);
        // Stride 1: every step is a raw evaluation
        let config = ScreeningConfig::builder()
            .tolerance_km(64.0)
            .threshold_km(5.0)
            .lookahead_hours(1)
            .step_seconds(8)
            .interpolation_stride(1)
            .build()
            .unwrap();
        let provider = ExactProvider { start };
        let objects = vec![object(1), object(2)];

        let cache =
            PositionCache::from_knots(KnotCache::build(&objects, &provider, start, &config));

        let events = group_and_reduce(check_pairs(&objects, &cache, &config));
        assert_eq!(events.len(), 1);
        let refined = refine_detection(&events[0], &cache, &provider, &config).unwrap();

        assert_relative_eq!(refined.distance_km, 2.0, max_relative = 1e-12);
        assert_relative_eq!(
            (refined.tca - start).to_seconds(),
            16.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn refinement_drops_events_above_threshold() {
        let start = Epoch::from_gregorian_utc(2026, 1, 1, 0, 0, 0, 0);
        // Threshold below the 2 km true miss distance
        let config = ScreeningConfig::builder()
            .tolerance_km(64.0)
            .threshold_km(1.0)
            .lookahead_hours(1)
            .step_seconds(8)
            .interpolation_stride(24)
            .build()
            .unwrap();
        let provider = CrossingProvider { start };
        let objects = vec![object(1), object(2)];

        let cache =
            PositionCache::from_knots(KnotCache::build(&objects, &provider, start, &config));

        let events = group_and_reduce(check_pairs(&objects, &cache, &config));
        assert_eq!(events.len(), 1);
        assert!(refine_detection(&events[0], &cache, &provider, &config).is_none());
    }
}

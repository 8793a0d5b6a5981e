//! # Screening cycle orchestration
//!
//! [`screen_catalog`] runs one full screening sweep over an in-memory
//! snapshot; [`run_cycle`] wraps it with the external collaborators, loading
//! the snapshot from a [`CatalogProvider`] and handing the result set to a
//! [`ConjunctionStore`] for wholesale replacement. Collaborator failures
//! propagate untouched; a cycle persists either a complete replacement set
//! or nothing.

use std::sync::Arc;
use std::time::Instant;

use hifitime::Epoch;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::catalog::{CatalogProvider, ScanObject};
use crate::collision_probability::probability_and_build;
use crate::config::ScreeningConfig;
use crate::conjunction::{Conjunction, ConjunctionStore};
use crate::propagation::knot_cache::KnotCache;
use crate::propagation::position_cache::PositionCache;
use crate::propagation::PropagatorProvider;
use crate::scan::{check_pairs, group_and_reduce, refine_detection};

/// Screen a catalog snapshot for conjunctions within the lookahead window.
///
/// Arguments
/// -----------------
/// * `objects`: the catalog snapshot for this cycle.
/// * `provider`: builds per-worker propagators for knot evaluation and
///   refinement.
/// * `config`: validated screening parameters.
/// * `start_time`: absolute time of step 0 (wall-clock UTC in production, a
///   fixed anchor in tests and benchmarks).
///
/// Return
/// ----------
/// * One [`Conjunction`] per distinct object pair per orbital pass under
///   the collision threshold, in no guaranteed order. Values are
///   deterministic for a given snapshot, configuration, and anchor time.
pub fn screen_catalog<P: PropagatorProvider>(
    objects: Vec<ScanObject>,
    provider: &P,
    config: &ScreeningConfig,
    start_time: Epoch,
) -> Vec<Conjunction> {
    let started = Instant::now();
    info!("Starting conjunction screening...");

    let objects = dedup_by_id(objects);
    debug!("Screening {} objects", objects.len());

    let knots = KnotCache::build(&objects, provider, start_time, config);
    let cache = PositionCache::from_knots(knots);

    let detections = check_pairs(&objects, &cache, config);
    debug!("Coarse sweep found {} detections", detections.len());

    let events = group_and_reduce(detections);
    debug!("Reduced to {} events", events.len());

    let refined: Vec<_> = events
        .par_iter()
        .filter_map(|event| refine_detection(event, &cache, provider, config))
        .collect();
    debug!("Refined {} events under threshold", refined.len());

    let conjunctions: Vec<Conjunction> = refined.par_iter().map(probability_and_build).collect();

    info!(
        "Conjunction screening completed in {}ms, found {} conjunctions",
        started.elapsed().as_millis(),
        conjunctions.len()
    );
    conjunctions
}

/// Run one full cycle against the external collaborators: snapshot, screen,
/// replace-all persist.
pub fn run_cycle<C, P, S>(
    catalog: &C,
    provider: &P,
    store: &S,
    config: &ScreeningConfig,
    start_time: Epoch,
) -> Result<Vec<Conjunction>, crate::screening_errors::ScreeningError>
where
    C: CatalogProvider,
    P: PropagatorProvider,
    S: ConjunctionStore,
{
    let objects = catalog.snapshot()?;
    debug!("Loaded {} objects", objects.len());

    let conjunctions = screen_catalog(objects, provider, config, start_time);

    store.replace_all(&conjunctions)?;
    Ok(conjunctions)
}

/// The dense caches index objects by position; duplicate catalog IDs would
/// alias. Keep the first occurrence.
fn dedup_by_id(objects: Vec<ScanObject>) -> Vec<Arc<ScanObject>> {
    let mut seen = ahash::AHashSet::with_capacity(objects.len());
    let mut unique = Vec::with_capacity(objects.len());
    for object in objects {
        if seen.insert(object.norad_id) {
            unique.push(Arc::new(object));
        } else {
            warn!("Duplicate catalog entry for object {}", object.norad_id);
        }
    }
    unique
}

//! # Catalog snapshot types
//!
//! A screening cycle works on an immutable snapshot of the object catalog:
//! one [`ScanObject`] per tracked object, loaded through a
//! [`CatalogProvider`] at the start of the cycle and shared read-only across
//! all workers for its duration.
//!
//! [`ObjectPair`] is the canonical identity of a close-approach candidate:
//! the two objects ordered by ascending catalog ID, so that `(a, b)` and
//! `(b, a)` hash and compare as the same key.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hifitime::Epoch;

use crate::constants::{Kilometer, NoradId};
use crate::screening_errors::ScreeningError;

/// Catalog classification of an orbiting object, used to assign an assumed
/// hard-body radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Payload,
    RocketBody,
    Debris,
    Unknown,
}

impl ObjectType {
    /// Parse the catalog's object-type string ("PAYLOAD", "ROCKET BODY",
    /// "DEBRIS"); anything else, including a missing value, is `Unknown`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("PAYLOAD") => ObjectType::Payload,
            Some("ROCKET BODY") => ObjectType::RocketBody,
            Some("DEBRIS") => ObjectType::Debris,
            _ => ObjectType::Unknown,
        }
    }
}

/// One catalog object as needed for scanning. Immutable per cycle.
#[derive(Debug, Clone)]
pub struct ScanObject {
    pub norad_id: NoradId,
    pub tle_line1: String,
    pub tle_line2: String,
    /// Reference epoch of the element set.
    pub epoch: Epoch,
    /// Perigee altitude, when the catalog carries it.
    pub perigee_km: Option<Kilometer>,
    pub object_type: ObjectType,
}

/// Unordered pair of catalog objects, stored canonically with
/// `a().norad_id < b().norad_id`.
#[derive(Debug, Clone)]
pub struct ObjectPair {
    a: Arc<ScanObject>,
    b: Arc<ScanObject>,
}

impl ObjectPair {
    pub fn new(x: Arc<ScanObject>, y: Arc<ScanObject>) -> Self {
        debug_assert_ne!(x.norad_id, y.norad_id);
        if x.norad_id < y.norad_id {
            ObjectPair { a: x, b: y }
        } else {
            ObjectPair { a: y, b: x }
        }
    }

    pub fn a(&self) -> &Arc<ScanObject> {
        &self.a
    }

    pub fn b(&self) -> &Arc<ScanObject> {
        &self.b
    }

    /// Canonical `(smaller, larger)` catalog IDs.
    pub fn ids(&self) -> (NoradId, NoradId) {
        (self.a.norad_id, self.b.norad_id)
    }
}

impl PartialEq for ObjectPair {
    fn eq(&self, other: &Self) -> bool {
        self.ids() == other.ids()
    }
}

impl Eq for ObjectPair {}

impl Hash for ObjectPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ids().hash(state);
    }
}

impl PartialOrd for ObjectPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ids().cmp(&other.ids())
    }
}

/// Source of catalog snapshots. Ingestion, caching, and retry policy all
/// belong to the implementor; the screening core only consumes the result.
pub trait CatalogProvider {
    fn snapshot(&self) -> Result<Vec<ScanObject>, ScreeningError>;
}

#[cfg(test)]
mod catalog_test {
    use super::*;

    fn object(norad_id: NoradId) -> Arc<ScanObject> {
        Arc::new(ScanObject {
            norad_id,
            tle_line1: String::new(),
            tle_line2: String::new(),
            epoch: Epoch::from_gregorian_utc(2026, 1, 1, 0, 0, 0, 0),
            perigee_km: None,
            object_type: ObjectType::Unknown,
        })
    }

    #[test]
    fn pair_is_canonical() {
        let (x, y) = (object(42), object(7));
        let pair = ObjectPair::new(x.clone(), y.clone());
        assert_eq!(pair.ids(), (7, 42));
        assert_eq!(pair, ObjectPair::new(y, x));
    }

    #[test]
    fn object_type_parsing() {
        assert_eq!(ObjectType::parse(Some("PAYLOAD")), ObjectType::Payload);
        assert_eq!(
            ObjectType::parse(Some("ROCKET BODY")),
            ObjectType::RocketBody
        );
        assert_eq!(ObjectType::parse(Some("DEBRIS")), ObjectType::Debris);
        assert_eq!(ObjectType::parse(Some("TBA")), ObjectType::Unknown);
        assert_eq!(ObjectType::parse(None), ObjectType::Unknown);
    }
}

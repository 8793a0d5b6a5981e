pub mod catalog;
pub mod collision_probability;
pub mod config;
pub mod conjunction;
pub mod constants;
pub mod propagation;
pub mod scan;
pub mod screening;
pub mod screening_errors;

pub use catalog::{CatalogProvider, ObjectPair, ObjectType, ScanObject};
pub use config::ScreeningConfig;
pub use conjunction::{Conjunction, ConjunctionStore};
pub use propagation::{
    OrbitState, Propagator, PropagatorProvider, SgpPropagator, SgpPropagatorProvider,
};
pub use screening::{run_cycle, screen_catalog};
pub use screening_errors::ScreeningError;

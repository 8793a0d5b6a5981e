use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Invalid screening configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Element set rejected for object {norad_id}: {reason}")]
    ElementSetRejected { norad_id: u32, reason: String },

    #[error("Propagation failed: {0}")]
    Propagation(String),

    #[error("Degenerate encounter geometry: {0}")]
    DegenerateEncounter(String),

    #[error("Projected covariance is singular (cannot be diagonalized)")]
    SingularCovariance,

    #[error("Catalog snapshot failed: {0}")]
    Catalog(String),

    #[error("Persisting conjunctions failed: {0}")]
    Persistence(String),
}

impl PartialEq for ScreeningError {
    fn eq(&self, other: &Self) -> bool {
        use ScreeningError::*;
        match (self, other) {
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (
                ElementSetRejected {
                    norad_id: a,
                    reason: ra,
                },
                ElementSetRejected {
                    norad_id: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (Propagation(a), Propagation(b)) => a == b,
            (DegenerateEncounter(a), DegenerateEncounter(b)) => a == b,
            (SingularCovariance, SingularCovariance) => true,
            (Catalog(a), Catalog(b)) => a == b,
            (Persistence(a), Persistence(b)) => a == b,
            _ => false,
        }
    }
}

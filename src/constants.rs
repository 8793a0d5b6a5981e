//! # Constants and type definitions for Skywatch
//!
//! This module centralizes the **unit conversions** and **common type
//! definitions** used throughout the `skywatch` library.
//!
//! Model constants that belong to a single component (covariance growth
//! rates, hard-body radii) live next to the code that uses them in
//! [`collision_probability`](crate::collision_probability).

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Meters per kilometer
pub const M_PER_KM: f64 = 1_000.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Distance in kilometers
pub type Kilometer = f64;

/// Speed in meters per second
pub type MeterPerSecond = f64;

/// Catalog identifier of an orbiting object (NORAD catalog number)
pub type NoradId = u32;

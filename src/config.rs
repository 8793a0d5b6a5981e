//! # Screening parameters
//!
//! This module defines the [`ScreeningConfig`] struct and its builder, which
//! control every tunable of the conjunction screening pipeline: the coarse
//! screening radius, the spatial-grid cell size, the collision-relevant
//! distance threshold, the lookahead window, the sampling step, and the
//! propagation stride used by the interpolating position cache.
//!
//! ## Pipeline overview
//!
//! 1. **Position caching** - positions are evaluated every
//!    `interpolation_stride` steps and linearly interpolated in between,
//!    covering `lookahead_hours` at `step_seconds` resolution.
//!
//! 2. **Coarse sweep** - a spatial grid with `cell_size_km` cells screens
//!    every step for pairs closer than `tolerance_km`.
//!
//! 3. **Refinement** - events are refined analytically and kept only when
//!    the closest approach is within `threshold_km`.
//!
//! Validation happens once, in [`ScreeningConfigBuilder::build`]: a cycle
//! must never start with a non-positive parameter.
//!
//! ## Example
//!
//! ```rust
//! use skywatch::config::ScreeningConfig;
//!
//! let config = ScreeningConfig::builder()
//!     .tolerance_km(64.0)
//!     .threshold_km(5.0)
//!     .lookahead_hours(24)
//!     .step_seconds(8)
//!     .interpolation_stride(24)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.cell_size_km, 64.0); // defaults to the tolerance
//! ```

use crate::screening_errors::ScreeningError;

/// Tunable parameters of one screening cycle.
///
/// Fields
/// -----------------
/// * `tolerance_km` - coarse screening radius; pairs farther apart than this
///   at every sampled step are never considered.
/// * `cell_size_km` - spatial-grid cell edge. A tuning parameter, not
///   physics: too small multiplies neighbor-cell checks, too large degrades
///   bucket selectivity. Defaults to `tolerance_km`.
/// * `threshold_km` - final collision-relevant distance; only refined events
///   at or below this miss distance become conjunctions.
/// * `lookahead_hours` - length of the screening window.
/// * `step_seconds` - sampling step of the position cache.
/// * `interpolation_stride` - number of steps between two expensive
///   propagator evaluations; intermediate steps are interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningConfig {
    pub tolerance_km: f64,
    pub cell_size_km: f64,
    pub threshold_km: f64,
    pub lookahead_hours: u32,
    pub step_seconds: u32,
    pub interpolation_stride: usize,
}

impl ScreeningConfig {
    pub fn builder() -> ScreeningConfigBuilder {
        ScreeningConfigBuilder::new()
    }

    /// Number of sampled steps covering the lookahead window, endpoints
    /// included.
    pub fn total_steps(&self) -> usize {
        (self.lookahead_hours as usize * 3600) / self.step_seconds as usize + 1
    }
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        ScreeningConfig {
            tolerance_km: 64.0,
            cell_size_km: 64.0,
            threshold_km: 5.0,
            lookahead_hours: 24,
            step_seconds: 8,
            interpolation_stride: 24,
        }
    }
}

/// Builder for [`ScreeningConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct ScreeningConfigBuilder {
    tolerance_km: Option<f64>,
    cell_size_km: Option<f64>,
    threshold_km: Option<f64>,
    lookahead_hours: Option<u32>,
    step_seconds: Option<u32>,
    interpolation_stride: Option<usize>,
}

impl ScreeningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance_km(mut self, v: f64) -> Self {
        self.tolerance_km = Some(v);
        self
    }

    pub fn cell_size_km(mut self, v: f64) -> Self {
        self.cell_size_km = Some(v);
        self
    }

    pub fn threshold_km(mut self, v: f64) -> Self {
        self.threshold_km = Some(v);
        self
    }

    pub fn lookahead_hours(mut self, v: u32) -> Self {
        self.lookahead_hours = Some(v);
        self
    }

    pub fn step_seconds(mut self, v: u32) -> Self {
        self.step_seconds = Some(v);
        self
    }

    pub fn interpolation_stride(mut self, v: usize) -> Self {
        self.interpolation_stride = Some(v);
        self
    }

    /// Validate and produce the final [`ScreeningConfig`].
    ///
    /// Return
    /// ----------
    /// * The configuration, or [`ScreeningError::InvalidConfiguration`] when
    ///   any parameter is non-positive. An unset `cell_size_km` falls back to
    ///   `tolerance_km`.
    pub fn build(self) -> Result<ScreeningConfig, ScreeningError> {
        let defaults = ScreeningConfig::default();

        let tolerance_km = self.tolerance_km.unwrap_or(defaults.tolerance_km);
        let cell_size_km = self.cell_size_km.unwrap_or(tolerance_km);
        let threshold_km = self.threshold_km.unwrap_or(defaults.threshold_km);
        let lookahead_hours = self.lookahead_hours.unwrap_or(defaults.lookahead_hours);
        let step_seconds = self.step_seconds.unwrap_or(defaults.step_seconds);
        let interpolation_stride = self
            .interpolation_stride
            .unwrap_or(defaults.interpolation_stride);

        if !(tolerance_km > 0.0) {
            return Err(ScreeningError::InvalidConfiguration(
                "tolerance_km must be positive".into(),
            ));
        }
        if !(cell_size_km > 0.0) {
            return Err(ScreeningError::InvalidConfiguration(
                "cell_size_km must be positive".into(),
            ));
        }
        if !(threshold_km > 0.0) {
            return Err(ScreeningError::InvalidConfiguration(
                "threshold_km must be positive".into(),
            ));
        }
        if lookahead_hours == 0 {
            return Err(ScreeningError::InvalidConfiguration(
                "lookahead_hours must be positive".into(),
            ));
        }
        if step_seconds == 0 {
            return Err(ScreeningError::InvalidConfiguration(
                "step_seconds must be positive".into(),
            ));
        }
        if interpolation_stride == 0 {
            return Err(ScreeningError::InvalidConfiguration(
                "interpolation_stride must be positive".into(),
            ));
        }

        Ok(ScreeningConfig {
            tolerance_km,
            cell_size_km,
            threshold_km,
            lookahead_hours,
            step_seconds,
            interpolation_stride,
        })
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScreeningConfig::builder().build().unwrap();
        assert_eq!(config, ScreeningConfig::default());
        assert_eq!(config.total_steps(), 24 * 3600 / 8 + 1);
    }

    #[test]
    fn cell_size_falls_back_to_tolerance() {
        let config = ScreeningConfig::builder()
            .tolerance_km(100.0)
            .build()
            .unwrap();
        assert_eq!(config.cell_size_km, 100.0);

        let config = ScreeningConfig::builder()
            .tolerance_km(100.0)
            .cell_size_km(25.0)
            .build()
            .unwrap();
        assert_eq!(config.cell_size_km, 25.0);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(matches!(
            ScreeningConfig::builder().tolerance_km(0.0).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ScreeningConfig::builder().tolerance_km(-1.0).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ScreeningConfig::builder().threshold_km(f64::NAN).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ScreeningConfig::builder().step_seconds(0).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ScreeningConfig::builder().interpolation_stride(0).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ScreeningConfig::builder().lookahead_hours(0).build(),
            Err(ScreeningError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn uneven_step_division_truncates() {
        let config = ScreeningConfig::builder()
            .lookahead_hours(1)
            .step_seconds(7)
            .build()
            .unwrap();
        assert_eq!(config.total_steps(), 3600 / 7 + 1);
    }
}

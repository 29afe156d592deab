//! Tunable tolerances and sampling densities.

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::Tolerance;

use crate::error::{HlrError, Result};

/// Parameters of a hidden-line run.
///
/// Every field has a default, so a TOML document only needs the keys it
/// overrides:
///
/// ```toml
/// linear_tolerance = 1e-5
/// edge_samples = 48
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlrParams {
    /// Linear tolerance (mm): coincidence, projected closeness, depth ties.
    pub linear_tolerance: f64,
    /// Angular tolerance (radians): parallel tests.
    pub angular_tolerance: f64,
    /// Parametric tolerance on curve parameters.
    pub parametric_tolerance: f64,
    /// Visibility intervals shorter than this (chord, mm) merge into a neighbour.
    pub min_interval_length: f64,
    /// Minimum samples per edge when searching for visibility changes.
    pub edge_samples: usize,
    /// Samples used by the cheap outside test of an interval.
    pub classify_samples: usize,
    /// Newton iterations when refining projected crossings.
    pub max_newton_iterations: usize,
    /// Bisection steps when locating a visibility change.
    pub bisection_iterations: usize,
    /// Recursive splits allowed when an interval is not uniform.
    pub refine_depth: usize,
    /// Adjacent faces whose normals differ by less than this (radians) make a smooth edge.
    pub smooth_angle: f64,
    /// Grid resolution per parameter direction for face sampling.
    pub face_samples: usize,
    /// Default isoline count per direction when a shape is loaded without one.
    pub iso_count: usize,
}

impl Default for HlrParams {
    fn default() -> Self {
        Self {
            linear_tolerance: 1e-6,
            angular_tolerance: 1e-9,
            parametric_tolerance: 1e-9,
            min_interval_length: 1e-4,
            edge_samples: 32,
            classify_samples: 5,
            max_newton_iterations: 30,
            bisection_iterations: 60,
            refine_depth: 6,
            smooth_angle: 1e-3,
            face_samples: 9,
            iso_count: 0,
        }
    }
}

impl HlrParams {
    /// Parse parameters from a TOML document and validate them.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| HlrError::InvalidParams(e.to_string()))
    }

    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.linear_tolerance > 0.0 && self.linear_tolerance.is_finite()) {
            return Err(HlrError::InvalidParams(
                "linear_tolerance must be positive".into(),
            ));
        }
        if !(self.angular_tolerance > 0.0) || !(self.parametric_tolerance > 0.0) {
            return Err(HlrError::InvalidParams(
                "angular and parametric tolerances must be positive".into(),
            ));
        }
        if self.min_interval_length < self.linear_tolerance {
            return Err(HlrError::InvalidParams(
                "min_interval_length must be at least linear_tolerance".into(),
            ));
        }
        if self.edge_samples < 2 || self.classify_samples < 1 {
            return Err(HlrError::InvalidParams(
                "edge_samples must be >= 2 and classify_samples >= 1".into(),
            ));
        }
        if self.max_newton_iterations == 0 || self.bisection_iterations == 0 {
            return Err(HlrError::InvalidParams(
                "iteration limits must be positive".into(),
            ));
        }
        if self.face_samples < 2 {
            return Err(HlrError::InvalidParams("face_samples must be >= 2".into()));
        }
        if !(0.0..std::f64::consts::FRAC_PI_2).contains(&self.smooth_angle) {
            return Err(HlrError::InvalidParams(
                "smooth_angle must be in [0, π/2)".into(),
            ));
        }
        Ok(())
    }

    /// Tolerances as a geometry-layer value.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            linear: self.linear_tolerance,
            angular: self.angular_tolerance,
            parametric: self.parametric_tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HlrParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let p = HlrParams::from_toml_str("edge_samples = 48\nlinear_tolerance = 1e-5\n").unwrap();
        assert_eq!(p.edge_samples, 48);
        assert_eq!(p.linear_tolerance, 1e-5);
        assert_eq!(p.classify_samples, HlrParams::default().classify_samples);
    }

    #[test]
    fn test_toml_round_trip() {
        let p = HlrParams {
            iso_count: 3,
            ..Default::default()
        };
        let s = p.to_toml_string().unwrap();
        assert_eq!(HlrParams::from_toml_str(&s).unwrap(), p);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = HlrParams::from_toml_str("edge_samples = \"many\"").unwrap_err();
        assert!(matches!(err, HlrError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let p = HlrParams {
            linear_tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(HlrError::InvalidParams(_))));
        let p = HlrParams {
            min_interval_length: 1e-9,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }
}

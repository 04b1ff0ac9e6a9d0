use log::warn;
use serde::{Deserialize, Serialize};

/// Numeric constants and capacity knobs for a single engine call.
///
/// All thresholds default to the fixed values carried over from the
/// original mosaic toolchain. Callers may override them (e.g. to relax
/// `area_ratio_thresh` for degenerate test meshes) without touching any
/// kernel code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sphere radius, in meters.
    pub radius: f64,
    /// Maximum vertex count a clipped polygon may hold.
    pub mv: usize,
    /// Determinant threshold below which `clip_2dx2d` reports a degenerate clip.
    pub epsln: f64,
    /// Minimum `area / min(area_src, area_dst)` ratio for a tuple to be emitted.
    pub area_ratio_thresh: f64,
    /// A source cell participates iff `mask > mask_thresh`.
    pub mask_thresh: f64,
    /// Tolerance for "coincident" comparisons inside the spherical primitives.
    pub small: f64,
    /// Tolerance for recognizing a pole vertex (`|lat| >= pi/2 - tol_pole`).
    pub tol_pole: f64,
    /// Upper bound on the number of exchange tuples a single call may emit.
    pub max_xgrid: usize,
}

/// `RADIUS = 6371000.0 m`: mean radius of the Earth used throughout the engine.
pub const RADIUS: f64 = 6_371_000.0;
/// Maximum clipper polygon vertex count.
pub const MV: usize = 20;
/// Determinant/degeneracy tolerance for the convex clipper.
pub const EPSLN: f64 = 1e-10;
/// Area-ratio threshold below which a clipped sliver is discarded as noise.
pub const AREA_RATIO_THRESH: f64 = 1e-6;
/// Mask activation threshold.
pub const MASK_THRESH: f64 = 0.5;
/// General "close enough to treat as equal" tolerance for spherical primitives.
pub const SMALL: f64 = 1e-10;
/// Pole-vertex recognition tolerance.
pub const TOL_POLE: f64 = 1e-6;

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            radius: RADIUS,
            mv: MV,
            epsln: EPSLN,
            area_ratio_thresh: AREA_RATIO_THRESH,
            mask_thresh: MASK_THRESH,
            small: SMALL,
            tol_pole: TOL_POLE,
            max_xgrid: 1_000_000,
        }
    }
}

impl EngineConfig {
    /// Build a config with every threshold at its default, overriding only
    /// the emission capacity -- the one knob nearly every caller needs to
    /// size for its own problem.
    pub fn with_capacity(max_xgrid: usize) -> Self {
        let mut cfg = EngineConfig::default();
        cfg.max_xgrid = max_xgrid;
        cfg
    }

    pub(crate) fn validate(&self) {
        if self.mv < 4 {
            warn!("EngineConfig.mv = {} is smaller than a quadrilateral; clipping will be unable to represent most intersections", self.mv);
        }
        if self.radius <= 0.0 {
            warn!("EngineConfig.radius = {} is not positive", self.radius);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.radius, 6_371_000.0);
        assert_eq!(cfg.mv, 20);
        assert_eq!(cfg.epsln, 1e-10);
        assert_eq!(cfg.area_ratio_thresh, 1e-6);
        assert_eq!(cfg.mask_thresh, 0.5);
        assert_eq!(cfg.small, 1e-10);
        assert_eq!(cfg.tol_pole, 1e-6);
    }

    #[test]
    fn with_capacity_overrides_only_capacity() {
        let cfg = EngineConfig::with_capacity(42);
        assert_eq!(cfg.max_xgrid, 42);
        assert_eq!(cfg.radius, EngineConfig::default().radius);
    }
}

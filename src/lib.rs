//! Spherical exchange-grid engine for conservative remapping between two
//! logically-rectangular quadrilateral meshes on the sphere.
//!
//! Given a source and a destination mesh (each either a full curvilinear
//! corner mesh or a separable lon/lat mesh) plus a source mask, the
//! [`exchange`] builder enumerates every non-empty intersection cell
//! ("exchange cell") with its spherical area and, for second-order
//! kernels, its centroid. [`remap`] then applies those tuples to move a
//! scalar field from source to destination conservatively, and
//! [`gradient`] supplies the C-grid gradient operator second-order remap
//! needs as input.
//!
//! All angular quantities throughout are radians; all lengths and areas
//! are in units of [`config::EngineConfig::radius`] (meters, by default).

pub mod clip;
pub mod config;
pub mod error;
pub mod exchange;
pub mod gradient;
pub mod grid_metrics;
pub mod mesh;
pub mod remap;
pub mod sphere;

pub use config::EngineConfig;
pub use error::Error;
pub use exchange::{Centroid, ExchangeSet, ExchangeTuple};
pub use mesh::{CornerMesh, Mask, ScalarField, SeparableMesh};

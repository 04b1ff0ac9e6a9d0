//! Polygon clipping on the sphere-as-plane approximation: the axis-aligned
//! box clip used by the separable kernels, and the general convex-vs-convex
//! clip used between two curvilinear cells. Both treat coordinates as
//! planar -- callers must apply [`crate::sphere::fix_lon`] first so every
//! vertex shares a single 2*pi branch.

pub mod axis_aligned;
pub mod convex;

pub use axis_aligned::clip;
pub use convex::clip_2dx2d;

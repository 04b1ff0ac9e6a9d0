use thiserror::Error;

/// Errors produced by the exchange-grid engine.
///
/// Every detected condition invalidates the result of the whole call, so
/// there is no variant meant for local recovery: callers map these to a
/// diagnostic and abort the run they were part of.
#[derive(Error, Debug)]
pub enum Error {
    /// An exchange kernel tried to emit past the configured capacity.
    #[error("too many intersections: capacity {capacity} exceeded at source cell ({j_src}, {i_src})")]
    TooManyIntersections {
        capacity: usize,
        j_src: usize,
        i_src: usize,
    },

    /// `clip_2dx2d` found a clip edge and a subject edge that are parallel
    /// (determinant below `epsln`), which violates the clipper's
    /// convex/non-degenerate precondition.
    #[error("degenerate clip: parallel edges (|det| < {epsln})")]
    DegenerateClip { epsln: f64 },

    /// A mesh failed validation: latitude out of range, a non-monotone
    /// separable axis, or (when checked) a non-convex cell.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Scratch or output allocation could not be satisfied at the
    /// requested capacity.
    #[error("allocation failure: {0}")]
    AllocFailure(String),
}

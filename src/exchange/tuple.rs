//! Exchange tuples and the per-call accumulation context.
//!
//! The original source kept a running tuple cursor and shared scratch
//! buffers as module-level globals. Here that state lives in
//! [`ExchangeSet`], a plain struct constructed fresh per call and passed
//! explicitly -- no ambient state survives across calls.

use crate::error::Error;

/// One non-empty intersection polygon between a source and destination
/// cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeTuple {
    pub i_src: usize,
    pub j_src: usize,
    pub i_dst: usize,
    pub j_dst: usize,
    /// Area in m^2 (or in units of `radius^2` if a non-default radius was used).
    pub area: f64,
    /// Centroid moments, present only for order-2 kernels.
    pub centroid: Option<Centroid>,
}

/// Un-normalized centroid moments of an exchange cell: `(clon, clat)`.
/// Divide by `area` (and add back the branch reference for `clon`) to
/// recover the true centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub clon: f64,
    pub clat: f64,
}

/// Accumulates exchange tuples up to a fixed capacity, matching the
/// spec's fixed-capacity `MAX_XGRID` failure mode inside a managed-memory
/// idiom: pushing past capacity returns an error rather than silently
/// reallocating.
#[derive(Debug, Default)]
pub struct ExchangeSet {
    capacity: usize,
    tuples: Vec<ExchangeTuple>,
}

impl ExchangeSet {
    pub fn with_capacity(capacity: usize) -> Self {
        ExchangeSet {
            capacity,
            tuples: Vec::with_capacity(capacity.min(1 << 16)),
        }
    }

    pub fn push(&mut self, tuple: ExchangeTuple) -> Result<(), Error> {
        if self.tuples.len() >= self.capacity {
            return Err(Error::TooManyIntersections {
                capacity: self.capacity,
                j_src: tuple.j_src,
                i_src: tuple.i_src,
            });
        }
        self.tuples.push(tuple);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn into_vec(self) -> Vec<ExchangeTuple> {
        self.tuples
    }

    pub fn as_slice(&self) -> &[ExchangeTuple] {
        &self.tuples
    }
}

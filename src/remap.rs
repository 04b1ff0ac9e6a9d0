//! First- and second-order conservative remap application: consume
//! exchange tuples plus a source field to produce a destination field.

use ndarray::Array2;

use crate::exchange::ExchangeTuple;
use crate::mesh::ScalarField;

/// Area-weighted first-order remap: `D[j',i'] = sum_tuples S[j,i] * area /
/// A_dst[j',i']`. `dst` is zero-initialized before accumulation. Mass is
/// exactly conserved when the source mesh fully covers every destination
/// cell touched.
pub fn remap_order1(tuples: &[ExchangeTuple], src: &Array2<f64>, area_dst: &Array2<f64>) -> Array2<f64> {
    let mut dst = Array2::zeros(area_dst.raw_dim());
    for t in tuples {
        let a_dst = area_dst[[t.j_dst, t.i_dst]];
        if a_dst <= 0.0 {
            continue;
        }
        dst[[t.j_dst, t.i_dst]] += src[[t.j_src, t.i_src]] * t.area / a_dst;
    }
    dst
}

/// Per-source-cell gradient and centroid inputs consumed by
/// [`remap_order2`].
pub struct GradientField {
    pub gx: Array2<f64>,
    pub gy: Array2<f64>,
    /// Un-normalized source-cell centroid longitude moment divided by the
    /// cell's own area (i.e. the normalized centroid longitude), per cell.
    pub clon_src: Array2<f64>,
    /// Normalized source-cell centroid latitude, per cell.
    pub clat_src: Array2<f64>,
    /// `true` where the gradient correction is disabled because at least
    /// one of the cell's 8 neighbors is missing; boundary cells are never
    /// extrapolated into.
    pub disabled: Array2<bool>,
}

impl GradientField {
    /// Builds the disablement mask from a source field's missing-value
    /// pattern: a cell is disabled whenever any of its 8 neighbors (or the
    /// cell itself, at the mesh boundary, stands in for a missing
    /// neighbor) is missing per [`ScalarField::is_missing`].
    pub fn neighbor_mask(field: &ScalarField) -> Array2<bool> {
        let (ny, nx) = field.values.dim();
        let mut disabled = Array2::from_elem((ny, nx), false);
        for j in 0..ny {
            for i in 0..nx {
                let mut any_missing = false;
                for dj in -1i64..=1 {
                    for di in -1i64..=1 {
                        if dj == 0 && di == 0 {
                            continue;
                        }
                        let jj = j as i64 + dj;
                        let ii = i as i64 + di;
                        if jj < 0 || ii < 0 || jj >= ny as i64 || ii >= nx as i64 {
                            any_missing = true;
                        } else if field.is_missing(jj as usize, ii as usize) {
                            any_missing = true;
                        }
                    }
                }
                disabled[[j, i]] = any_missing;
            }
        }
        disabled
    }
}

/// Second-order remap: as [`remap_order1`], but each tuple's source value
/// is replaced by a first-order Taylor expansion from the source cell's
/// centroid to the intersection centroid, unless the gradient correction
/// is disabled for that source cell.
pub fn remap_order2(
    tuples: &[ExchangeTuple],
    src: &Array2<f64>,
    area_dst: &Array2<f64>,
    grad: &GradientField,
) -> Array2<f64> {
    let mut dst = Array2::zeros(area_dst.raw_dim());
    for t in tuples {
        let a_dst = area_dst[[t.j_dst, t.i_dst]];
        if a_dst <= 0.0 || t.area <= 0.0 {
            continue;
        }
        let base = src[[t.j_src, t.i_src]];
        let value = match (t.centroid, grad.disabled[[t.j_src, t.i_src]]) {
            (Some(c), false) => {
                let clon = c.clon / t.area;
                let clat = c.clat / t.area;
                base + grad.gx[[t.j_src, t.i_src]] * (clon - grad.clon_src[[t.j_src, t.i_src]])
                    + grad.gy[[t.j_src, t.i_src]] * (clat - grad.clat_src[[t.j_src, t.i_src]])
            }
            _ => base,
        };
        dst[[t.j_dst, t.i_dst]] += value * t.area / a_dst;
    }
    dst
}

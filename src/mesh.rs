//! Mesh and field value types.
//!
//! Replaces the original's flat-array pointer arithmetic (`j*(nx+1)+i`) with
//! a thin value type exposing `corner`/`cell_corners` by `(i, j)`. Index
//! arithmetic stays here, at the array/adapter boundary; kernels never
//! compute a row-major offset themselves.

use ndarray::Array2;

use crate::error::Error;

/// A logically-rectangular `nx x ny`-cell quadrilateral mesh: `(nx+1) x
/// (ny+1)` corner vertices in radians, row-major in `(j, i)`.
#[derive(Debug, Clone)]
pub struct CornerMesh {
    nx: usize,
    ny: usize,
    lon: Array2<f64>,
    lat: Array2<f64>,
}

impl CornerMesh {
    /// Builds a mesh from `(ny+1) x (nx+1)` row-major corner arrays.
    ///
    /// # Panics
    /// Panics if `lon`/`lat` don't have exactly `(ny+1) x (nx+1)` entries.
    pub fn new(nx: usize, ny: usize, lon: Array2<f64>, lat: Array2<f64>) -> Self {
        assert_eq!(lon.dim(), (ny + 1, nx + 1));
        assert_eq!(lat.dim(), (ny + 1, nx + 1));
        CornerMesh { nx, ny, lon, lat }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Longitude/latitude (radians) of corner vertex `(i, j)`.
    pub fn corner(&self, i: usize, j: usize) -> (f64, f64) {
        (self.lon[[j, i]], self.lat[[j, i]])
    }

    /// The four corners of cell `(i, j)` in counter-clockwise order:
    /// `(i,j), (i+1,j), (i+1,j+1), (i,j+1)`.
    pub fn cell_corners(&self, i: usize, j: usize) -> ([f64; 4], [f64; 4]) {
        let (x0, y0) = self.corner(i, j);
        let (x1, y1) = self.corner(i + 1, j);
        let (x2, y2) = self.corner(i + 1, j + 1);
        let (x3, y3) = self.corner(i, j + 1);
        ([x0, x1, x2, x3], [y0, y1, y2, y3])
    }

    /// Opt-in validation pass: every latitude lies in `[-pi/2, pi/2]`. Run
    /// once per mesh ahead of a kernel call rather than re-checked per
    /// cell.
    pub fn validate(&self) -> Result<(), Error> {
        let half_pi = std::f64::consts::FRAC_PI_2;
        for &lat in self.lat.iter() {
            if !(-half_pi..=half_pi).contains(&lat) {
                return Err(Error::InvalidMesh(format!(
                    "corner latitude {lat} outside [-pi/2, pi/2]"
                )));
            }
        }
        Ok(())
    }
}

/// A separable "1-D" mesh: `nx+1` longitudes and `ny+1` latitudes whose
/// outer product forms the corner grid. Longitudes must be monotonic.
#[derive(Debug, Clone)]
pub struct SeparableMesh {
    lon: Vec<f64>,
    lat: Vec<f64>,
}

impl SeparableMesh {
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        SeparableMesh { lon, lat }
    }

    pub fn nx(&self) -> usize {
        self.lon.len() - 1
    }

    pub fn ny(&self) -> usize {
        self.lat.len() - 1
    }

    pub fn is_lon_monotonic(&self) -> bool {
        self.lon.windows(2).all(|w| w[0] < w[1]) || self.lon.windows(2).all(|w| w[0] > w[1])
    }

    /// Opt-in validation pass: latitudes in range and longitudes monotone.
    pub fn validate(&self) -> Result<(), Error> {
        let half_pi = std::f64::consts::FRAC_PI_2;
        for &lat in &self.lat {
            if !(-half_pi..=half_pi).contains(&lat) {
                return Err(Error::InvalidMesh(format!(
                    "latitude {lat} outside [-pi/2, pi/2]"
                )));
            }
        }
        if !self.is_lon_monotonic() {
            return Err(Error::InvalidMesh("separable mesh longitudes are not monotonic".into()));
        }
        Ok(())
    }

    /// The four corners of cell `(i, j)` in counter-clockwise order.
    pub fn cell_corners(&self, i: usize, j: usize) -> ([f64; 4], [f64; 4]) {
        let (x0, x1) = (self.lon[i], self.lon[i + 1]);
        let (y0, y1) = (self.lat[j], self.lat[j + 1]);
        ([x0, x1, x1, x0], [y0, y0, y1, y1])
    }
}

/// A dense `ny x nx` scalar field with an explicit missing-value sentinel.
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub values: Array2<f64>,
    pub missing: f64,
}

impl ScalarField {
    pub fn new(values: Array2<f64>, missing: f64) -> Self {
        ScalarField { values, missing }
    }

    pub fn is_missing(&self, j: usize, i: usize) -> bool {
        let v = self.values[[j, i]];
        v.is_nan() || (v - self.missing).abs() < 1e-12
    }
}

/// A dense `ny x nx` mask; a cell participates iff its value exceeds the
/// configured threshold.
#[derive(Debug, Clone)]
pub struct Mask {
    pub values: Array2<f64>,
}

impl Mask {
    pub fn new(values: Array2<f64>) -> Self {
        Mask { values }
    }

    pub fn all_active(ny: usize, nx: usize) -> Self {
        Mask {
            values: Array2::from_elem((ny, nx), 1.0),
        }
    }

    pub fn value(&self, j: usize, i: usize) -> f64 {
        self.values[[j, i]]
    }

    pub fn is_active(&self, j: usize, i: usize, thresh: f64) -> bool {
        self.value(j, i) > thresh
    }
}

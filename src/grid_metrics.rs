//! Per-cell area and auxiliary grid geometry (edge lengths, bounding
//! radii) derived from a mesh's corner vertices.

use ndarray::Array2;

use crate::config::EngineConfig;
use crate::mesh::CornerMesh;
use crate::sphere::{self, lat_lon_to_xyz};

/// Computes the spherical area of every cell in `mesh`, applying
/// [`sphere::fix_lon`] (target `pi`) to each cell first so pole-adjacent
/// cells are handled correctly.
pub fn get_grid_area(mesh: &CornerMesh, cfg: &EngineConfig) -> Array2<f64> {
    get_grid_area_impl(mesh, cfg, true)
}

/// As [`get_grid_area`], but skips the `fix_lon` pass -- only valid when
/// the mesh is known not to cross a longitude branch cut or a pole.
pub fn get_grid_area_no_adjust(mesh: &CornerMesh, cfg: &EngineConfig) -> Array2<f64> {
    get_grid_area_impl(mesh, cfg, false)
}

fn get_grid_area_impl(mesh: &CornerMesh, cfg: &EngineConfig, adjust: bool) -> Array2<f64> {
    let (nx, ny) = (mesh.nx(), mesh.ny());
    let mut area = Array2::zeros((ny, nx));
    for j in 0..ny {
        for i in 0..nx {
            let (x, y) = mesh.cell_corners(i, j);
            let mut xv = x.to_vec();
            let mut yv = y.to_vec();
            let a = if adjust {
                sphere::fix_lon(&mut xv, &mut yv, std::f64::consts::PI, cfg.tol_pole);
                sphere::poly_area(&xv, &yv, cfg.radius, cfg.small)
            } else {
                sphere::poly_area_no_adjust(&xv, &yv, cfg.radius, cfg.small)
            };
            area[[j, i]] = a;
        }
    }
    area
}

/// Maximum pairwise great-circle-chord (Cartesian) distance among a set of
/// lon/lat vertices: the radius of the smallest enclosing ball centered at
/// their centroid is bounded by this.
pub fn grid_box_radius(lon: &[f64], lat: &[f64]) -> f64 {
    let pts: Vec<_> = lon
        .iter()
        .zip(lat.iter())
        .map(|(&lo, &la)| lat_lon_to_xyz(lo, la))
        .collect();
    let mut max_d: f64 = 0.0;
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            let d = sphere::norm(sphere::Xyz {
                x: pts[i].x - pts[j].x,
                y: pts[i].y - pts[j].y,
                z: pts[i].z - pts[j].z,
            });
            max_d = max_d.max(d);
        }
    }
    max_d
}

/// Maximum pairwise Cartesian distance between two vertex sets. Used by an
/// optional coarse bounding-sphere pre-pass ahead of the lat/lon bbox
/// rejection. The running maximum starts at `0.0` -- the original left
/// this uninitialized, which is undefined behavior when read.
pub fn dist_between_boxes(lon1: &[f64], lat1: &[f64], lon2: &[f64], lat2: &[f64]) -> f64 {
    let mut dist: f64 = 0.0;
    for (&lo1, &la1) in lon1.iter().zip(lat1.iter()) {
        let p1 = lat_lon_to_xyz(lo1, la1);
        for (&lo2, &la2) in lon2.iter().zip(lat2.iter()) {
            let p2 = lat_lon_to_xyz(lo2, la2);
            let d = sphere::norm(sphere::Xyz {
                x: p1.x - p2.x,
                y: p1.y - p2.y,
                z: p1.z - p2.z,
            });
            dist = dist.max(d);
        }
    }
    dist
}

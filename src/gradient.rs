//! C-grid gradient operator: interpolate T-cell (A-grid) scalars onto
//! C-cell corners, then recover the T-cell gradient from the corner
//! values via Green's theorem (a boundary circulation integral rather
//! than finite differences, so it stays well-defined on a curvilinear
//! mesh with no assumption of uniform spacing).

use ndarray::Array2;

use crate::config::EngineConfig;
use crate::mesh::CornerMesh;
use crate::sphere::{self, Xyz};

/// Static per-cell geometry needed by [`a2b_ord2`] and [`grad_c2l`],
/// computed once per mesh and reused across however many fields need a
/// gradient.
pub struct CGridInfo {
    /// Cell area, in units of `radius^2`, shape `(ny, nx)`.
    pub area: Array2<f64>,
    /// Horizontal (N-cell) edge length at each grid row, shape `(ny+1, nx)`.
    pub dx: Array2<f64>,
    /// Vertical (E-cell) edge length at each grid column, shape
    /// `(ny, nx+1)`.
    pub dy: Array2<f64>,
    /// Unit normal of each horizontal edge, shape `(ny+1, nx)`.
    pub en_n: Array2<Xyz>,
    /// Unit normal of each vertical edge, shape `(ny, nx+1)`.
    pub en_e: Array2<Xyz>,
    /// Unit east tangent at each T-cell center, shape `(ny, nx)`.
    pub vlon: Array2<Xyz>,
    /// Unit north tangent at each T-cell center, shape `(ny, nx)`.
    pub vlat: Array2<Xyz>,
    /// Boundary interpolation weight along the west edge, indexed by
    /// corner row `j`; share of the southern flanking T-cell's value.
    pub edge_w: Vec<f64>,
    /// Boundary interpolation weight along the east edge, indexed by
    /// corner row `j`.
    pub edge_e: Vec<f64>,
    /// Boundary interpolation weight along the south edge, indexed by
    /// corner column `i`; share of the western flanking T-cell's value.
    pub edge_s: Vec<f64>,
    /// Boundary interpolation weight along the north edge, indexed by
    /// corner column `i`.
    pub edge_n: Vec<f64>,
}

/// `(lon, lat)` of a T-cell's center, taken as the plain mean of its four
/// corners. Good enough for cells that don't straddle the branch cut;
/// large cells crossing it would need `fix_lon` first.
fn cell_center(mesh: &CornerMesh, i: usize, j: usize) -> (f64, f64) {
    let (x, y) = mesh.cell_corners(i, j);
    (x.iter().sum::<f64>() / 4.0, y.iter().sum::<f64>() / 4.0)
}

/// Precomputes cell areas, edge lengths/normals, T-cell tangent frames,
/// and boundary interpolation weights from a corner mesh. The four
/// `on_*_edge` flags mark whether a given side of `mesh` is a true
/// boundary of the domain (as opposed to a seam shared with a
/// neighboring tile in a multi-tile mosaic); this crate only ever
/// operates on a single standalone mesh, so callers pass `true` for all
/// four.
pub fn calc_c2l_grid_info(
    mesh: &CornerMesh,
    cfg: &EngineConfig,
    on_west_edge: bool,
    on_east_edge: bool,
    on_south_edge: bool,
    on_north_edge: bool,
) -> CGridInfo {
    let (nx, ny) = (mesh.nx(), mesh.ny());

    let mut area = Array2::zeros((ny, nx));
    for j in 0..ny {
        for i in 0..nx {
            let (lon_ll, lat_ll) = mesh.corner(i, j);
            let (lon_lr, lat_lr) = mesh.corner(i + 1, j);
            let (lon_ul, lat_ul) = mesh.corner(i, j + 1);
            let (lon_ur, lat_ur) = mesh.corner(i + 1, j + 1);
            let ll = sphere::lat_lon_to_xyz(lon_ll, lat_ll);
            let lr = sphere::lat_lon_to_xyz(lon_lr, lat_lr);
            let ul = sphere::lat_lon_to_xyz(lon_ul, lat_ul);
            let ur = sphere::lat_lon_to_xyz(lon_ur, lat_ur);
            area[[j, i]] = sphere::spherical_excess_area(ll, ul, lr, ur, cfg.radius);
        }
    }

    let mut dx = Array2::zeros((ny + 1, nx));
    let mut en_n = Array2::from_elem((ny + 1, nx), Xyz { x: 0.0, y: 0.0, z: 0.0 });
    for j in 0..=ny {
        for i in 0..nx {
            let (lon0, lat0) = mesh.corner(i, j);
            let (lon1, lat1) = mesh.corner(i + 1, j);
            dx[[j, i]] = sphere::great_circle_distance(lon0, lat0, lon1, lat1, cfg.radius);
            let p0 = sphere::lat_lon_to_xyz(lon0, lat0);
            let p1 = sphere::lat_lon_to_xyz(lon1, lat1);
            en_n[[j, i]] = sphere::normalize(sphere::cross(p0, p1));
        }
    }

    let mut dy = Array2::zeros((ny, nx + 1));
    let mut en_e = Array2::from_elem((ny, nx + 1), Xyz { x: 0.0, y: 0.0, z: 0.0 });
    for j in 0..ny {
        for i in 0..=nx {
            let (lon0, lat0) = mesh.corner(i, j);
            let (lon1, lat1) = mesh.corner(i, j + 1);
            dy[[j, i]] = sphere::great_circle_distance(lon0, lat0, lon1, lat1, cfg.radius);
            let p_top = sphere::lat_lon_to_xyz(lon1, lat1);
            let p_bot = sphere::lat_lon_to_xyz(lon0, lat0);
            en_e[[j, i]] = sphere::normalize(sphere::cross(p_top, p_bot));
        }
    }

    let mut vlon = Array2::from_elem((ny, nx), Xyz { x: 0.0, y: 0.0, z: 0.0 });
    let mut vlat = vlon.clone();
    for j in 0..ny {
        for i in 0..nx {
            let (lon, lat) = cell_center(mesh, i, j);
            let (e, n) = sphere::unit_vect_latlon(lon, lat);
            vlon[[j, i]] = e;
            vlat[[j, i]] = n;
        }
    }

    let mut edge_w = vec![0.5; ny + 1];
    let mut edge_e = vec![0.5; ny + 1];
    let mut edge_s = vec![0.5; nx + 1];
    let mut edge_n = vec![0.5; nx + 1];

    if on_west_edge {
        for j in 1..ny {
            let (clon, clat) = mesh.corner(0, j);
            let (lo_lon, lo_lat) = cell_center(mesh, 0, j - 1);
            let (hi_lon, hi_lat) = cell_center(mesh, 0, j);
            edge_w[j] = get_edge(clon, clat, lo_lon, lo_lat, hi_lon, hi_lat, cfg);
        }
    }
    if on_east_edge {
        for j in 1..ny {
            let (clon, clat) = mesh.corner(nx, j);
            let (lo_lon, lo_lat) = cell_center(mesh, nx - 1, j - 1);
            let (hi_lon, hi_lat) = cell_center(mesh, nx - 1, j);
            edge_e[j] = get_edge(clon, clat, lo_lon, lo_lat, hi_lon, hi_lat, cfg);
        }
    }
    if on_south_edge {
        for i in 1..nx {
            let (clon, clat) = mesh.corner(i, 0);
            let (lo_lon, lo_lat) = cell_center(mesh, i - 1, 0);
            let (hi_lon, hi_lat) = cell_center(mesh, i, 0);
            edge_s[i] = get_edge(clon, clat, lo_lon, lo_lat, hi_lon, hi_lat, cfg);
        }
    }
    if on_north_edge {
        for i in 1..nx {
            let (clon, clat) = mesh.corner(i, ny);
            let (lo_lon, lo_lat) = cell_center(mesh, i - 1, ny - 1);
            let (hi_lon, hi_lat) = cell_center(mesh, i, ny - 1);
            edge_n[i] = get_edge(clon, clat, lo_lon, lo_lat, hi_lon, hi_lat, cfg);
        }
    }

    CGridInfo { area, dx, dy, en_n, en_e, vlon, vlat, edge_w, edge_e, edge_s, edge_n }
}

/// Interpolates a T-cell-centered scalar field `a` onto the mesh's
/// `(ny+1, nx+1)` corners. Strictly interior corners average their 4
/// surrounding T-cells; corners on a tile edge blend the 2 T-cells
/// flanking them by `info`'s precomputed great-circle weight rather than
/// an unweighted average, since there is no halo neighbor across the
/// edge to average against; the 4 true mesh corners take their single
/// adjacent cell's value verbatim.
pub fn a2b_ord2(
    a: &Array2<f64>,
    info: &CGridInfo,
    on_west_edge: bool,
    on_east_edge: bool,
    on_south_edge: bool,
    on_north_edge: bool,
) -> Array2<f64> {
    let (ny, nx) = a.dim();
    let mut b = Array2::zeros((ny + 1, nx + 1));

    let istart = if on_west_edge { 1 } else { 0 };
    let iend = if on_east_edge { nx } else { nx + 1 };
    let jstart = if on_south_edge { 1 } else { 0 };
    let jend = if on_north_edge { ny } else { ny + 1 };

    for j in jstart..jend {
        for i in istart..iend {
            let mut sum = 0.0;
            let mut count = 0.0;
            for &(dj, di) in &[(-1i64, -1i64), (-1, 0), (0, -1), (0, 0)] {
                let jj = j as i64 + dj;
                let ii = i as i64 + di;
                if jj < 0 || ii < 0 || jj >= ny as i64 || ii >= nx as i64 {
                    continue;
                }
                sum += a[[jj as usize, ii as usize]];
                count += 1.0;
            }
            b[[j, i]] = if count > 0.0 { sum / count } else { 0.0 };
        }
    }

    if on_west_edge {
        for j in jstart..jend {
            b[[j, 0]] = if j == 0 {
                a[[0, 0]]
            } else if j == ny {
                a[[ny - 1, 0]]
            } else {
                let w = info.edge_w[j];
                w * a[[j - 1, 0]] + (1.0 - w) * a[[j, 0]]
            };
        }
    }
    if on_east_edge {
        for j in jstart..jend {
            b[[j, nx]] = if j == 0 {
                a[[0, nx - 1]]
            } else if j == ny {
                a[[ny - 1, nx - 1]]
            } else {
                let w = info.edge_e[j];
                w * a[[j - 1, nx - 1]] + (1.0 - w) * a[[j, nx - 1]]
            };
        }
    }
    if on_south_edge {
        for i in istart..iend {
            b[[0, i]] = if i == 0 {
                a[[0, 0]]
            } else if i == nx {
                a[[0, nx - 1]]
            } else {
                let w = info.edge_s[i];
                w * a[[0, i - 1]] + (1.0 - w) * a[[0, i]]
            };
        }
    }
    if on_north_edge {
        for i in istart..iend {
            b[[ny, i]] = if i == 0 {
                a[[ny - 1, 0]]
            } else if i == nx {
                a[[ny - 1, nx - 1]]
            } else {
                let w = info.edge_n[i];
                w * a[[ny - 1, i - 1]] + (1.0 - w) * a[[ny - 1, i]]
            };
        }
    }

    if on_west_edge && on_south_edge {
        b[[0, 0]] = a[[0, 0]];
    }
    if on_east_edge && on_south_edge {
        b[[0, nx]] = a[[0, nx - 1]];
    }
    if on_east_edge && on_north_edge {
        b[[ny, nx]] = a[[ny - 1, nx - 1]];
    }
    if on_west_edge && on_north_edge {
        b[[ny, 0]] = a[[ny - 1, 0]];
    }

    b
}

/// Great-circle-distance interpolation weight for blending the two
/// T-cells flanking a boundary corner: the share of `lo`'s value in the
/// interpolated result (`1 - weight` goes to `hi`). The closer cell gets
/// the larger share.
pub fn get_edge(
    corner_lon: f64,
    corner_lat: f64,
    lo_lon: f64,
    lo_lat: f64,
    hi_lon: f64,
    hi_lat: f64,
    cfg: &EngineConfig,
) -> f64 {
    let d_lo = sphere::great_circle_distance(corner_lon, corner_lat, lo_lon, lo_lat, cfg.radius);
    let d_hi = sphere::great_circle_distance(corner_lon, corner_lat, hi_lon, hi_lat, cfg.radius);
    let denom = (d_lo + d_hi).max(cfg.small);
    d_hi / denom
}

/// Recovers the T-cell gradient `(grad_lon, grad_lat)` of a scalar field
/// from its corner values `b` (as produced by [`a2b_ord2`]) via Green's
/// theorem: integrate `b * n * edge_length` around each cell's boundary,
/// divide by the cell area, and project the resulting vector onto the
/// local east/north tangent frame. The area is in `radius^2` units and
/// the edge lengths in `radius` units, so the quotient needs one more
/// factor of `radius` to come out in the same units as `b`'s gradient.
pub fn grad_c2l(b: &Array2<f64>, info: &CGridInfo, cfg: &EngineConfig) -> (Array2<f64>, Array2<f64>) {
    let (nyp1, nx) = info.dx.dim();
    let ny = nyp1 - 1;
    let mut gx = Array2::zeros((ny, nx));
    let mut gy = Array2::zeros((ny, nx));

    for j in 0..ny {
        for i in 0..nx {
            let pdx_top = scale(info.en_n[[j + 1, i]], 0.5 * (b[[j + 1, i]] + b[[j + 1, i + 1]]) * info.dx[[j + 1, i]]);
            let pdx_bot = scale(info.en_n[[j, i]], 0.5 * (b[[j, i]] + b[[j, i + 1]]) * info.dx[[j, i]]);
            let pdy_right = scale(info.en_e[[j, i + 1]], 0.5 * (b[[j, i + 1]] + b[[j + 1, i + 1]]) * info.dy[[j, i + 1]]);
            let pdy_left = scale(info.en_e[[j, i]], 0.5 * (b[[j, i]] + b[[j + 1, i]]) * info.dy[[j, i]]);

            let grad3 = Xyz {
                x: pdx_top.x - pdx_bot.x - pdy_left.x + pdy_right.x,
                y: pdx_top.y - pdx_bot.y - pdy_left.y + pdy_right.y,
                z: pdx_top.z - pdx_bot.z - pdy_left.z + pdy_right.z,
            };

            let area = info.area[[j, i]].max(cfg.small);
            gx[[j, i]] = sphere::dot(grad3, info.vlon[[j, i]]) / area * cfg.radius;
            gy[[j, i]] = sphere::dot(grad3, info.vlat[[j, i]]) / area * cfg.radius;
        }
    }

    (gx, gy)
}

fn scale(v: Xyz, s: f64) -> Xyz {
    Xyz { x: v.x * s, y: v.y * s, z: v.z * s }
}

//! Spherical polygon primitives: area and centroid-moment line integrals,
//! great-circle distance, lat/lon <-> xyz conversion, and the longitude
//! branch-cut normalization (`fix_lon`) every clipper and kernel relies on.
//!
//! All angular inputs and outputs are radians.

use crate::config::EngineConfig;

/// A point on the unit sphere in Cartesian coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Converts longitude/latitude (radians) to a unit Cartesian vector.
pub fn lat_lon_to_xyz(lon: f64, lat: f64) -> Xyz {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Xyz {
        x: cos_lat * cos_lon,
        y: cos_lat * sin_lon,
        z: sin_lat,
    }
}

/// Converts a Cartesian vector back to longitude/latitude (radians),
/// normalizing the vector first. Longitude is returned in `[0, 2*pi)`; at
/// the pole (`|x| + |y| < eps`) longitude is `0`.
pub fn xyz_to_lat_lon(v: Xyz, eps: f64) -> (f64, f64) {
    let norm = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
    let (x, y, z) = (v.x / norm, v.y / norm, v.z / norm);
    let lat = z.asin();
    let mut lon = if x.abs() + y.abs() < eps {
        0.0
    } else {
        y.atan2(x)
    };
    if lon < 0.0 {
        lon += 2.0 * std::f64::consts::PI;
    }
    (lon, lat)
}

/// Great-circle distance between two lon/lat points, in the same units as
/// `radius`. Uses the haversine form -- the plain `acos` form loses
/// precision catastrophically at short distances.
pub fn great_circle_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64, radius: f64) -> f64 {
    let dlat = (lat2 - lat1) / 2.0;
    let dlon = (lon2 - lon1) / 2.0;
    let s = (dlat.sin().powi(2) + lat1.cos() * lat2.cos() * dlon.sin().powi(2)).sqrt();
    radius * 2.0 * s.clamp(-1.0, 1.0).asin()
}

/// Wraps an angle difference into `[-pi, pi]`.
fn wrap_pi(mut d: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    while d > std::f64::consts::PI {
        d -= two_pi;
    }
    while d < -std::f64::consts::PI {
        d += two_pi;
    }
    d
}

/// Spherical polygon area via line-integral of `-sin(lat) dlon`, wrapping
/// each edge's longitude delta into `[-pi, pi]` first. `x`/`y` are
/// longitude/latitude in radians; the polygon is implicitly closed
/// (edge `n-1 -> 0` is included).
///
/// Returns the area in units of `radius^2`.
pub fn poly_area(x: &[f64], y: &[f64], radius: f64, small: f64) -> f64 {
    poly_area_impl(x, y, radius, small, true)
}

/// Same as [`poly_area`] but without wrapping the per-edge longitude delta;
/// only valid when the caller guarantees the polygon does not cross a
/// branch cut.
pub fn poly_area_no_adjust(x: &[f64], y: &[f64], radius: f64, small: f64) -> f64 {
    poly_area_impl(x, y, radius, small, false)
}

fn poly_area_impl(x: &[f64], y: &[f64], radius: f64, small: f64, wrap: bool) -> f64 {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let mut dx = x[j] - x[i];
        if wrap {
            dx = wrap_pi(dx);
        }
        if dx == 0.0 {
            continue;
        }
        if (y[i] - y[j]).abs() < small {
            area -= dx * ((y[i] + y[j]) / 2.0).sin();
        } else {
            area += dx * (y[i].cos() - y[j].cos()) / (y[i] - y[j]);
        }
    }
    area * radius * radius
}

/// Un-normalized latitude moment `int int lat dA` of the polygon
/// (radius-squared units); the true centroid latitude is `ctrlat / area`.
pub fn poly_ctrlat(x: &[f64], y: &[f64], radius: f64, small: f64) -> f64 {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    let mut ctrlat = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let dx = wrap_pi(x[j] - x[i]);
        if dx == 0.0 {
            continue;
        }
        let hdy = (y[j] - y[i]) / 2.0;
        let phi_bar = (y[i] + y[j]) / 2.0;
        if hdy.abs() < small {
            ctrlat -= dx * (2.0 * phi_bar.cos() + y[j] * phi_bar.sin() - y[i].cos());
        } else {
            ctrlat -=
                dx * ((hdy.sin() / hdy) * (2.0 * phi_bar.cos() + y[j] * phi_bar.sin()) - y[i].cos());
        }
    }
    ctrlat * radius * radius
}

/// `f(phi) = 1/2 (cos(phi) sin(phi) + phi)`, the antiderivative used by
/// [`poly_ctrlon`].
fn ctrlon_f(phi: f64) -> f64 {
    0.5 * (phi.cos() * phi.sin() + phi)
}

/// Un-normalized longitude moment of the polygon around a reference
/// longitude `clon` (radius-squared units); the true centroid longitude is
/// `ctrlon / area + clon`.
pub fn poly_ctrlon(x: &[f64], y: &[f64], clon: f64, radius: f64) -> f64 {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    let mut ctrlon = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let dphi = wrap_pi(x[j] - x[i]);
        if dphi == 0.0 {
            continue;
        }
        let f1 = ctrlon_f(y[j]);
        let f2 = ctrlon_f(y[i]);
        let dphi1 = wrap_pi(x[j] - clon);
        let dphi2 = wrap_pi(x[i] - clon);

        if (dphi2 - dphi1).abs() < std::f64::consts::PI {
            ctrlon -= dphi * (dphi1 * f1 + dphi2 * f2) / 2.0;
        } else {
            let fac = dphi1.signum() * std::f64::consts::PI;
            let fint = f1 + (f2 - f1) * (fac - dphi1) / dphi.abs();
            ctrlon -= 0.5 * dphi1 * (dphi1 - fac) * f1 - 0.5 * dphi2 * (dphi2 + fac) * f2
                + 0.5 * fac * (dphi1 + dphi2) * fint;
        }
    }
    ctrlon * radius * radius
}

fn is_pole_lat(lat: f64, tol_pole: f64, half_pi: f64) -> bool {
    (lat.abs() - half_pi).abs() < tol_pole
}

/// Normalizes a polygon's longitudes onto a single 2*pi branch centered
/// near `tlon`, pairing up pole vertices in the process. Returns the
/// (possibly changed) vertex count; `x`/`y` are resized in place.
pub fn fix_lon(x: &mut Vec<f64>, y: &mut Vec<f64>, tlon: f64, tol_pole: f64) -> usize {
    let pi = std::f64::consts::PI;
    let half_pi = pi / 2.0;
    let two_pi = 2.0 * pi;
    let is_pole = |lat: f64| is_pole_lat(lat, tol_pole, half_pi);

    // Step 1: every pole vertex must be paired with another. A pole vertex
    // flanked by two pole neighbors is a redundant third wheel and is
    // dropped; a pole vertex flanked by two non-pole neighbors is isolated
    // and gets a duplicate inserted next to it so it has a partner.
    let mut i: i64 = 0;
    while (i as usize) < x.len() {
        let ui = i as usize;
        let nn = x.len();
        if is_pole(y[ui]) {
            let im = (ui + nn - 1) % nn;
            let ip = (ui + 1) % nn;
            if is_pole(y[im]) && is_pole(y[ip]) {
                x.remove(ui);
                y.remove(ui);
                i -= 1;
            } else if !is_pole(y[im]) && !is_pole(y[ip]) {
                x.insert(ui, x[ui]);
                y.insert(ui, y[ui]);
                i += 1;
            }
        }
        i += 1;
    }

    // Step 2: the first vertex of a pole pair takes the longitude of the
    // previous vertex, the second takes the longitude of the next vertex,
    // so the branch walk below never has to cross a pole vertex.
    let nn = x.len();
    for i in 0..nn {
        if is_pole(y[i]) {
            let im = (i + nn - 1) % nn;
            let ip = (i + 1) % nn;
            if !is_pole(y[im]) {
                x[i] = x[im];
            }
            if !is_pole(y[ip]) {
                x[i] = x[ip];
            }
        }
    }

    // Step 3: walk edges, unwrapping each vertex's longitude onto the same
    // continuous branch as its predecessor (mutating in place, not just
    // averaging) so the polygon never straddles the +-pi cut afterward.
    if x.is_empty() {
        return 0;
    }
    let mut x_sum = x[0];
    for i in 1..nn {
        let mut dx = x[i] - x[i - 1];
        if dx < -pi {
            dx += two_pi;
        } else if dx > pi {
            dx -= two_pi;
        }
        x[i] = x[i - 1] + dx;
        x_sum += x[i];
    }

    // Step 4: shift the whole polygon by +-2*pi so the mean lies within
    // pi of tlon.
    let dx = x_sum / nn as f64 - tlon;
    if dx < -pi {
        for v in x.iter_mut() {
            *v += two_pi;
        }
    } else if dx > pi {
        for v in x.iter_mut() {
            *v -= two_pi;
        }
    }

    x.len()
}

/// Interior spherical angle at vertex `v1` of the spherical triangle
/// `v1, v2, v3`, from the angle between the great-circle planes
/// `v1 x v2` and `v1 x v3`. Degenerates to `0` when either cross product
/// vanishes (collapsed corner).
pub fn spherical_angle(v1: Xyz, v2: Xyz, v3: Xyz) -> f64 {
    let px = cross(v1, v2);
    let qx = cross(v1, v3);
    let pn = norm(px);
    let qn = norm(qx);
    if pn < 1e-20 || qn < 1e-20 {
        return 0.0;
    }
    let cos_angle = (dot(px, qx) / (pn * qn)).clamp(-1.0, 1.0);
    cos_angle.acos()
}

/// Area of a spherical quadrilateral from the spherical excess of its four
/// interior angles: `R^2 (a1 + a2 + a3 + a4 - 2*pi)`. More accurate than
/// the line-integral form near the poles; used for cubed-sphere cells.
pub fn spherical_excess_area(p_ll: Xyz, p_ul: Xyz, p_lr: Xyz, p_ur: Xyz, radius: f64) -> f64 {
    let a1 = spherical_angle(p_ll, p_lr, p_ul);
    let a2 = spherical_angle(p_lr, p_ur, p_ll);
    let a3 = spherical_angle(p_ur, p_ul, p_lr);
    let a4 = spherical_angle(p_ul, p_ll, p_ur);
    radius * radius * (a1 + a2 + a3 + a4 - 2.0 * std::f64::consts::PI)
}

/// Unit east (`vlon`) and north (`vlat`) tangent vectors, in Cartesian, at
/// a given lon/lat point.
pub fn unit_vect_latlon(lon: f64, lat: f64) -> (Xyz, Xyz) {
    let (sin_lon, cos_lon) = lon.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let vlon = Xyz {
        x: -sin_lon,
        y: cos_lon,
        z: 0.0,
    };
    let vlat = Xyz {
        x: -sin_lat * cos_lon,
        y: -sin_lat * sin_lon,
        z: cos_lat,
    };
    (vlon, vlat)
}

pub fn cross(a: Xyz, b: Xyz) -> Xyz {
    Xyz {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

pub fn dot(a: Xyz, b: Xyz) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

pub fn norm(a: Xyz) -> f64 {
    dot(a, a).sqrt()
}

pub fn normalize(a: Xyz) -> Xyz {
    let n = norm(a);
    Xyz {
        x: a.x / n,
        y: a.y / n,
        z: a.z / n,
    }
}

/// Spherical midpoint between two lon/lat points: average the unit
/// Cartesian vectors and renormalize, rather than averaging lon/lat
/// directly (which is wrong near the date line and at high latitude).
pub fn mid_pt_sphere(lon1: f64, lat1: f64, lon2: f64, lat2: f64, eps: f64) -> (f64, f64) {
    let p1 = lat_lon_to_xyz(lon1, lat1);
    let p2 = lat_lon_to_xyz(lon2, lat2);
    let mid = normalize(Xyz {
        x: (p1.x + p2.x) / 2.0,
        y: (p1.y + p2.y) / 2.0,
        z: (p1.z + p2.z) / 2.0,
    });
    xyz_to_lat_lon(mid, eps)
}

/// Convenience wrapper reading thresholds out of an [`EngineConfig`].
pub fn poly_area_cfg(x: &[f64], y: &[f64], cfg: &EngineConfig) -> f64 {
    poly_area(x, y, cfg.radius, cfg.small)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn axis_aligned_box_area_matches_closed_form() {
        // box [0, pi/2] x [-pi/6, pi/6], R = 1
        let lon0 = 0.0;
        let lon1 = PI / 2.0;
        let lat0 = -PI / 6.0;
        let lat1 = PI / 6.0;
        let x = vec![lon0, lon1, lon1, lon0];
        let y = vec![lat0, lat0, lat1, lat1];
        let area = poly_area(&x, &y, 1.0, 1e-10);
        let expected = (lon1 - lon0) * (lat1.sin() - lat0.sin());
        assert_relative_eq!(area, expected, epsilon = 1e-9);
    }

    #[test]
    fn equatorial_strip_scenario_s3() {
        let x = vec![0.0, PI / 2.0, PI / 2.0, 0.0];
        let y = vec![-PI / 6.0, -PI / 6.0, PI / 6.0, PI / 6.0];
        let area = poly_area(&x, &y, 1.0, 1e-10);
        assert_relative_eq!(area, PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn great_circle_distance_antipodal_is_half_circumference() {
        let radius = 1.0;
        let d = great_circle_distance(0.0, 0.0, PI, 0.0, radius);
        assert_relative_eq!(d, PI, epsilon = 1e-12);
    }

    #[test]
    fn great_circle_distance_is_zero_for_identical_points() {
        let d = great_circle_distance(1.2, 0.4, 1.2, 0.4, 6_371_000.0);
        assert_relative_eq!(d, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn fix_lon_inserts_partner_for_isolated_pole_vertex() {
        // A single pole vertex flanked by two non-pole vertices with
        // differing longitudes has no partner to pair with; fix_lon must
        // insert one rather than leave it unpaired.
        let mut x = vec![0.5, 1.0, -1.0];
        let mut y = vec![PI / 2.0, 0.2, 0.3];
        let n = fix_lon(&mut x, &mut y, 0.0, 1e-6);
        assert_eq!(n, 4);
        assert_eq!(x.len(), 4);
        assert_relative_eq!(y[0], PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(y[1], PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn fix_lon_is_idempotent() {
        let mut x = vec![3.0, 3.2, -3.1, -2.9];
        let mut y = vec![0.1, 0.2, 0.2, 0.1];
        fix_lon(&mut x, &mut y, PI, 1e-6);
        let once = x.clone();
        fix_lon(&mut x, &mut y, PI, 1e-6);
        assert_eq!(x, once);
    }

    #[test]
    fn centroid_longitude_of_symmetric_box_is_midpoint() {
        let lon0 = 0.2;
        let lon1 = 0.6;
        let lat0 = -0.1;
        let lat1 = 0.3;
        let x = vec![lon0, lon1, lon1, lon0];
        let y = vec![lat0, lat0, lat1, lat1];
        let clon_ref = (lon0 + lon1) / 2.0;
        let area = poly_area(&x, &y, 1.0, 1e-10);
        let moment = poly_ctrlon(&x, &y, clon_ref, 1.0);
        let centroid_lon = moment / area + clon_ref;
        assert_relative_eq!(centroid_lon, clon_ref, epsilon = 1e-9);
    }

    #[test]
    fn unit_vect_latlon_is_orthonormal_to_position() {
        let lon = 0.7;
        let lat = 0.3;
        let p = lat_lon_to_xyz(lon, lat);
        let (vlon, vlat) = unit_vect_latlon(lon, lat);
        assert_relative_eq!(dot(p, vlon), 0.0, epsilon = 1e-12);
        assert_relative_eq!(dot(p, vlat), 0.0, epsilon = 1e-12);
        assert_relative_eq!(dot(vlon, vlat), 0.0, epsilon = 1e-12);
        assert_relative_eq!(norm(vlon), 1.0, epsilon = 1e-12);
        assert_relative_eq!(norm(vlat), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn xyz_roundtrip() {
        let lon = 1.1;
        let lat = -0.4;
        let p = lat_lon_to_xyz(lon, lat);
        let (lon2, lat2) = xyz_to_lat_lon(p, 1e-10);
        assert_relative_eq!(lon2, lon, epsilon = 1e-12);
        assert_relative_eq!(lat2, lat, epsilon = 1e-12);
    }
}

//! Property-based tests for the whole-crate invariants: whole-sphere area
//! partition, clipper idempotence/symmetry, pole robustness, and
//! order-1 remap conservation. Complements the per-module unit tests.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use ndarray::Array2;
use proptest::prelude::*;

use xgrid_geom::clip::clip_2dx2d;
use xgrid_geom::config::EngineConfig;
use xgrid_geom::exchange::xgrid_2dx2d_order1;
use xgrid_geom::grid_metrics::get_grid_area;
use xgrid_geom::remap::remap_order1;
use xgrid_geom::sphere::fix_lon;
use xgrid_geom::{CornerMesh, Mask};

fn lonlat_mesh(nx: usize, ny: usize, lon0: f64, lon1: f64, lat0: f64, lat1: f64) -> CornerMesh {
    let lon = Array2::from_shape_fn((ny + 1, nx + 1), |(_j, i)| {
        lon0 + (lon1 - lon0) * i as f64 / nx as f64
    });
    let lat = Array2::from_shape_fn((ny + 1, nx + 1), |(j, _i)| {
        lat0 + (lat1 - lat0) * j as f64 / ny as f64
    });
    CornerMesh::new(nx, ny, lon, lat)
}

fn planar_area(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 {
        return 0.0;
    }
    let mut a = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        a += x[i] * y[j] - x[j] * y[i];
    }
    a.abs() / 2.0
}

proptest! {
    /// Property 2: a mesh covering the whole sphere has cell areas summing
    /// to 4*pi*R^2.
    #[test]
    fn whole_sphere_partition(nx in 2usize..12, ny in 2usize..12) {
        let mesh = lonlat_mesh(nx, ny, 0.0, 2.0 * PI, -PI / 2.0, PI / 2.0);
        let cfg = EngineConfig { radius: 1.0, ..EngineConfig::default() };
        let area = get_grid_area(&mesh, &cfg);
        let total: f64 = area.iter().sum();
        assert_relative_eq!(total, 4.0 * PI, epsilon = 1e-6);
    }

    /// Property 6: clip_2dx2d(P, P) reproduces P's area.
    #[test]
    fn clipper_idempotence(
        w in 0.2f64..3.0,
        h in 0.2f64..3.0,
        x0 in -2.0f64..2.0,
        y0 in -2.0f64..2.0,
    ) {
        let p = (
            vec![x0, x0 + w, x0 + w, x0],
            vec![y0, y0, y0 + h, y0 + h],
        );
        let (x, y) = clip_2dx2d(&p.0, &p.1, &p.0, &p.1, 20, 1e-10, 1e-10).unwrap();
        assert_relative_eq!(planar_area(&x, &y), w * h, epsilon = 1e-9);
    }

    /// Property 7: clip area is symmetric in operand order for two
    /// overlapping axis-aligned boxes.
    #[test]
    fn clipper_symmetry(
        w1 in 0.3f64..2.0, h1 in 0.3f64..2.0,
        w2 in 0.3f64..2.0, h2 in 0.3f64..2.0,
        dx in -1.0f64..1.0, dy in -1.0f64..1.0,
    ) {
        let p = (vec![0.0, w1, w1, 0.0], vec![0.0, 0.0, h1, h1]);
        let q = (vec![dx, dx + w2, dx + w2, dx], vec![dy, dy, dy + h2, dy + h2]);
        let (x1, y1) = clip_2dx2d(&p.0, &p.1, &q.0, &q.1, 20, 1e-10, 1e-10).unwrap();
        let (x2, y2) = clip_2dx2d(&q.0, &q.1, &p.0, &p.1, 20, 1e-10, 1e-10).unwrap();
        assert_relative_eq!(planar_area(&x1, &y1), planar_area(&x2, &y2), epsilon = 1e-9);
    }

    /// Property 8: fix_lon applied twice is a no-op.
    #[test]
    fn fix_lon_idempotent(
        lons in prop::collection::vec(-3.14f64..3.14, 4..8),
        lat_base in -1.4f64..1.4,
    ) {
        let mut x = lons.clone();
        let mut y: Vec<f64> = x.iter().enumerate().map(|(k, _)| lat_base * 0.01 * k as f64 / x.len() as f64).collect();
        fix_lon(&mut x, &mut y, PI, 1e-6);
        let once_x = x.clone();
        let once_y = y.clone();
        fix_lon(&mut x, &mut y, PI, 1e-6);
        prop_assert_eq!(x, once_x);
        prop_assert_eq!(y, once_y);
    }

    /// Property 4: order-1 remap conserves total mass when the source mesh
    /// fully covers the destination (identical meshes, arbitrary field).
    #[test]
    fn remap_order1_conserves_mass(nx in 2usize..6, ny in 2usize..6, scale in 0.1f64..10.0) {
        let src = lonlat_mesh(nx, ny, 0.0, PI / 2.0, -PI / 6.0, PI / 6.0);
        let dst = lonlat_mesh(nx, ny, 0.0, PI / 2.0, -PI / 6.0, PI / 6.0);
        let mask = Mask::all_active(ny, nx);
        let cfg = EngineConfig::with_capacity(100_000);

        let tuples = xgrid_2dx2d_order1(&src, &dst, &mask, &cfg).unwrap();
        let area_src = get_grid_area(&src, &cfg);
        let area_dst = get_grid_area(&dst, &cfg);

        let field = Array2::from_shape_fn((ny, nx), |(j, i)| scale * (1.0 + i as f64 + j as f64));
        let d = remap_order1(&tuples, &field, &area_dst);

        let total_src: f64 = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (j, i)))
            .map(|(j, i)| field[[j, i]] * area_src[[j, i]])
            .sum();
        let total_dst: f64 = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (j, i)))
            .map(|(j, i)| d[[j, i]] * area_dst[[j, i]])
            .sum();
        assert_relative_eq!(total_src, total_dst, epsilon = 1e-6 * total_src.abs());
    }
}

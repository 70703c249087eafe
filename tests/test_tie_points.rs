use geocoding::core::{build_control_point_grid, sample_indices, sample_tie_points};
use geocoding::types::GeoError;
use ndarray::Array2;

fn lat_lon(lines: usize, samples: usize) -> (Array2<f32>, Array2<f32>) {
    let lat = Array2::from_shape_fn((lines, samples), |(r, c)| 78.0 - r as f32 * 0.002 + c as f32 * 0.0001);
    let lon = Array2::from_shape_fn((lines, samples), |(r, c)| 12.0 + c as f32 * 0.004 - r as f32 * 0.0002);
    (lat, lon)
}

#[test]
fn test_grid_from_100_by_200_arrays() {
    let (lat, lon) = lat_lon(100, 200);
    let grid = build_control_point_grid(lat.view(), lon.view(), 5).expect("grid");

    assert_eq!(grid.len(), 25);
    assert!(grid.wkt().contains("WGS"));

    let points = grid.points();
    assert_eq!((points[0].pixel_x, points[0].pixel_y), (1.0, 1.0));
    assert_eq!((points[24].pixel_x, points[24].pixel_y), (200.0, 100.0));
    assert_eq!(points[24].geo_y, lat[[99, 199]] as f64);
    assert_eq!(points[24].geo_x, lon[[99, 199]] as f64);
}

#[test]
fn test_pixel_coordinates_within_image() {
    for (lines, samples) in [(2, 2), (10, 3), (64, 128), (257, 31)] {
        let (lat, lon) = lat_lon(lines, samples);
        for n in 2..=8 {
            let points = sample_tie_points(lat.view(), lon.view(), n).expect("points");
            assert_eq!(points.len(), n * n);
            assert!(points.iter().all(|p| {
                p.pixel_x >= 1.0
                    && p.pixel_x <= samples as f64
                    && p.pixel_y >= 1.0
                    && p.pixel_y <= lines as f64
                    && p.geo_x.is_finite()
                    && p.geo_y.is_finite()
            }));
        }
    }
}

#[test]
fn test_boundary_rows_and_columns_sampled() {
    let (lat, lon) = lat_lon(45, 91);
    let points = sample_tie_points(lat.view(), lon.view(), 7).expect("points");

    let has = |f: &dyn Fn(f64, f64) -> bool| points.iter().any(|p| f(p.pixel_x, p.pixel_y));
    assert!(has(&|_, y| y == 1.0));
    assert!(has(&|_, y| y == 45.0));
    assert!(has(&|x, _| x == 1.0));
    assert!(has(&|x, _| x == 91.0));

    let rows = sample_indices(45, 7);
    assert_eq!(rows.first(), Some(&0));
    assert_eq!(rows.last(), Some(&44));
}

#[test]
fn test_mismatched_shapes_rejected() {
    let pairs = [((5, 5), (5, 6)), ((5, 5), (6, 5)), ((10, 20), (20, 10)), ((1, 1), (2, 2))];
    for (lat_shape, lon_shape) in pairs {
        let lat = Array2::<f64>::zeros(lat_shape);
        let lon = Array2::<f64>::zeros(lon_shape);
        let result = build_control_point_grid(lat.view(), lon.view(), 3);
        match result {
            Err(GeoError::ShapeMismatch { lat, lon }) => {
                assert_eq!(lat, lat_shape);
                assert_eq!(lon, lon_shape);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }
}

use geocoding::core::geocode::gcp_tiff_path;
use geocoding::core::{
    convert_landmask_to_sensor_geometry, geocode_image_from_lat_lon, GeocodingOutcome,
    GeocodingParams, LandmaskOutcome, LandmaskParams,
};
use geocoding::io::raster::{open_dataset, read_band, read_control_points, read_image, write_raster};
use geocoding::types::RasterData;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LINES: usize = 60;
const SAMPLES: usize = 80;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// lat = 60 - 0.01 * row, lon = 10 + 0.01 * col
fn write_lat_lon(dir: &Path) -> (PathBuf, PathBuf) {
    let lat = Array2::from_shape_fn((LINES, SAMPLES), |(r, _)| 60.0 - r as f64 * 0.01);
    let lon = Array2::from_shape_fn((LINES, SAMPLES), |(_, c)| 10.0 + c as f64 * 0.01);

    let lat_path = dir.join("lat.tif");
    let lon_path = dir.join("lon.tif");
    write_raster(&lat_path, "GTiff", &RasterData::SingleBand(lat), None).unwrap();
    write_raster(&lon_path, "GTiff", &RasterData::SingleBand(lon), None).unwrap();
    (lat_path, lon_path)
}

fn write_land_polygons(dir: &Path) -> PathBuf {
    let path = dir.join("land-polygons.geojson");
    let geojson = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[10.2, 59.8], [10.4, 59.8], [10.4, 59.7], [10.2, 59.7], [10.2, 59.8]]]
      }
    }
  ]
}"#;
    fs::write(&path, geojson).unwrap();
    path
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    init();
    let dir = tempfile::tempdir().unwrap();
    let (lat, lon) = write_lat_lon(dir.path());
    (dir, lat, lon)
}

#[test]
fn test_landmask_in_sensor_geometry() {
    let (dir, lat, lon) = setup();
    let shapefile = write_land_polygons(dir.path());
    let output = dir.path().join("landmask.img");
    let params = LandmaskParams {
        tie_points: 5,
        ..Default::default()
    };

    let outcome = convert_landmask_to_sensor_geometry(&lat, &lon, &shapefile, &output, &params).unwrap();
    match outcome {
        LandmaskOutcome::Written { path, report } => {
            assert_eq!(path, output);
            assert_eq!(report.polygons, 1);
            assert_eq!(report.rasterized, 1);
            assert_eq!(report.dropped_vertices, 0);
        }
        other => panic!("expected a written mask, got {:?}", other),
    }

    let dataset = open_dataset(&output).unwrap();
    assert_eq!(dataset.raster_size(), (SAMPLES, LINES));
    let mask = read_band::<u8>(&dataset, 1).unwrap();

    assert_eq!(mask[[25, 30]], 0);
    assert_eq!(mask[[5, 5]], 1);
    assert_eq!(mask[[50, 70]], 1);
    assert!(mask.iter().all(|&v| v == 0 || v == 1));

    let gcps = read_control_points(&output).unwrap();
    assert_eq!(gcps.len(), 25);
}

#[test]
fn test_existing_mask_is_kept() {
    let (dir, lat, lon) = setup();
    let shapefile = write_land_polygons(dir.path());
    let output = dir.path().join("landmask.img");
    let params = LandmaskParams {
        tie_points: 5,
        ..Default::default()
    };

    convert_landmask_to_sensor_geometry(&lat, &lon, &shapefile, &output, &params).unwrap();
    let again = convert_landmask_to_sensor_geometry(&lat, &lon, &shapefile, &output, &params).unwrap();
    assert_eq!(again, LandmaskOutcome::SkippedExisting(output.clone()));

    let forced = LandmaskParams { overwrite: true, ..params };
    let rerun = convert_landmask_to_sensor_geometry(&lat, &lon, &shapefile, &output, &forced).unwrap();
    assert!(matches!(rerun, LandmaskOutcome::Written { .. }));
}

fn write_image(dir: &Path) -> PathBuf {
    let path = dir.join("sigma0_hh.tif");
    let image = Array2::from_shape_fn((LINES, SAMPLES), |(r, c)| 1.0 + (r + c) as f32 * 0.1);
    write_raster(&path, "GTiff", &RasterData::SingleBand(image), None).unwrap();
    path
}

#[test]
fn test_geocode_image_from_lat_lon() {
    let (dir, lat, lon) = setup();
    let image = write_image(dir.path());
    let output = dir.path().join("out").join("sigma0_hh_epsg4326.tiff");
    let params = GeocodingParams {
        tie_points: 5,
        polynomial_order: 1,
        ..Default::default()
    };

    let outcome = geocode_image_from_lat_lon(&image, &lat, &lon, &output, 4326, 0.01, &params).unwrap();
    assert_eq!(outcome, GeocodingOutcome::Written(output.clone()));
    assert!(output.is_file());
    assert!(!gcp_tiff_path(&output).exists());

    let (width, height) = open_dataset(&output).unwrap().raster_size();
    assert!(width > 0 && height > 0);

    let again = geocode_image_from_lat_lon(&image, &lat, &lon, &output, 4326, 0.01, &params).unwrap();
    assert_eq!(again, GeocodingOutcome::SkippedExisting(output));
}

#[test]
fn test_geocode_keeps_gcp_file_on_request() {
    let (dir, lat, lon) = setup();
    let image = write_image(dir.path());
    let output = dir.path().join("sigma0_hh_epsg4326.tiff");
    let params = GeocodingParams {
        tie_points: 5,
        polynomial_order: 1,
        keep_gcp_file: true,
        ..Default::default()
    };

    geocode_image_from_lat_lon(&image, &lat, &lon, &output, 4326, 0.01, &params).unwrap();

    let intermediate = gcp_tiff_path(&output);
    assert!(intermediate.is_file());
    assert_eq!(read_control_points(&intermediate).unwrap().len(), 25);
}

#[test]
fn test_geocode_keeps_byte_image_type() {
    let (dir, lat, lon) = setup();
    let labels = dir.path().join("labels.tif");
    let classes = Array2::from_shape_fn((LINES, SAMPLES), |(r, c)| 1 + ((r / 10 + c / 10) % 4) as u8);
    write_raster(&labels, "GTiff", &RasterData::SingleBand(classes), None).unwrap();

    let output = dir.path().join("labels_epsg4326.tiff");
    let params = GeocodingParams {
        tie_points: 5,
        polynomial_order: 1,
        keep_gcp_file: true,
        ..Default::default()
    };
    geocode_image_from_lat_lon(&labels, &lat, &lon, &output, 4326, 0.01, &params).unwrap();

    assert_eq!(read_image(gcp_tiff_path(&output)).unwrap().type_name(), "Byte");
    let warped = read_image(&output).unwrap();
    assert_eq!(warped.type_name(), "Byte");
    assert_eq!(warped.band_count(), 1);
}

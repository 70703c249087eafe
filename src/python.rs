//! Python bindings (`geocoding._core`)

use crate::core::{
    build_control_point_grid, convert_landmask_to_sensor_geometry, geocode_image_from_lat_lon,
    geocode_image_from_product_gcps, GeocodingOutcome, GeocodingParams, LandmaskOutcome,
    LandmaskParams,
};
use crate::types::{ControlPointGrid, GeoError};
use numpy::PyReadonlyArray2;
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: GeoError) -> PyErr {
    match &err {
        GeoError::NotFound(_) => PyFileNotFoundError::new_err(err.to_string()),
        GeoError::ShapeMismatch { .. }
        | GeoError::InvalidConfiguration(_)
        | GeoError::InvalidData(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Any real numeric array as f64; float64 input is borrowed without a copy
fn as_f64_array<'py>(array: &'py PyAny) -> PyResult<PyReadonlyArray2<'py, f64>> {
    if let Ok(view) = array.extract::<PyReadonlyArray2<f64>>() {
        return Ok(view);
    }
    array.call_method1("astype", ("float64",))?.extract()
}

fn control_point_grid(lat: &PyAny, lon: &PyAny, tie_points: usize) -> PyResult<ControlPointGrid> {
    // float32 is what SNAP writes for lat/lon bands
    if let (Ok(lat), Ok(lon)) = (
        lat.extract::<PyReadonlyArray2<f32>>(),
        lon.extract::<PyReadonlyArray2<f32>>(),
    ) {
        return build_control_point_grid(lat.as_array(), lon.as_array(), tie_points)
            .map_err(to_py_err);
    }

    let (lat, lon) = (as_f64_array(lat)?, as_f64_array(lon)?);
    build_control_point_grid(lat.as_array(), lon.as_array(), tie_points).map_err(to_py_err)
}

/// Tie points as (pixel, line, x, y, z) tuples plus the GCP projection WKT
#[pyfunction]
#[pyo3(signature = (lat, lon, tie_points = 21))]
fn get_tie_points_from_lat_lon(
    lat: &PyAny,
    lon: &PyAny,
    tie_points: usize,
) -> PyResult<(Vec<(f64, f64, f64, f64, f64)>, String)> {
    let grid = control_point_grid(lat, lon, tie_points)?;

    let gcps = grid
        .points()
        .iter()
        .map(|p| (p.pixel_x, p.pixel_y, p.geo_x, p.geo_y, p.elevation))
        .collect();
    Ok((gcps, grid.wkt().to_string()))
}

/// Returns False when the output exists and overwrite is not set
#[pyfunction]
#[pyo3(name = "geocode_image_from_lat_lon", signature = (
    img_path,
    lat_path,
    lon_path,
    output_tiff_path,
    target_epsg,
    pixel_spacing,
    tie_points = 21,
    srcnodata = Some(0.0),
    dstnodata = Some(0.0),
    order = 3,
    resampling = "near",
    keep_gcp_file = false,
    overwrite = false
))]
#[allow(clippy::too_many_arguments)]
fn py_geocode_image_from_lat_lon(
    img_path: String,
    lat_path: String,
    lon_path: String,
    output_tiff_path: String,
    target_epsg: u32,
    pixel_spacing: f64,
    tie_points: usize,
    srcnodata: Option<f64>,
    dstnodata: Option<f64>,
    order: u32,
    resampling: &str,
    keep_gcp_file: bool,
    overwrite: bool,
) -> PyResult<bool> {
    let params = GeocodingParams {
        tie_points,
        polynomial_order: order,
        resampling: resampling.parse().map_err(to_py_err)?,
        src_nodata: srcnodata,
        dst_nodata: dstnodata,
        keep_gcp_file,
        overwrite,
    };

    let outcome = geocode_image_from_lat_lon(
        img_path,
        lat_path,
        lon_path,
        output_tiff_path,
        target_epsg,
        pixel_spacing,
        &params,
    )
    .map_err(to_py_err)?;

    Ok(matches!(outcome, GeocodingOutcome::Written(_)))
}

/// GCPs come from the product (e.g. a Sentinel-1 SAFE) instead of lat/lon bands
#[pyfunction]
#[pyo3(name = "geocode_image_from_product_gcps", signature = (
    img_path,
    product_path,
    output_tiff_path,
    target_epsg,
    pixel_spacing,
    srcnodata = Some(0.0),
    dstnodata = Some(0.0),
    order = 3,
    resampling = "near",
    keep_gcp_file = false,
    overwrite = false
))]
#[allow(clippy::too_many_arguments)]
fn py_geocode_image_from_product_gcps(
    img_path: String,
    product_path: String,
    output_tiff_path: String,
    target_epsg: u32,
    pixel_spacing: f64,
    srcnodata: Option<f64>,
    dstnodata: Option<f64>,
    order: u32,
    resampling: &str,
    keep_gcp_file: bool,
    overwrite: bool,
) -> PyResult<bool> {
    let params = GeocodingParams {
        polynomial_order: order,
        resampling: resampling.parse().map_err(to_py_err)?,
        src_nodata: srcnodata,
        dst_nodata: dstnodata,
        keep_gcp_file,
        overwrite,
        ..Default::default()
    };

    let outcome = geocode_image_from_product_gcps(
        img_path,
        product_path,
        output_tiff_path,
        target_epsg,
        pixel_spacing,
        &params,
    )
    .map_err(to_py_err)?;

    Ok(matches!(outcome, GeocodingOutcome::Written(_)))
}

/// Returns (rasterized, degenerate) polygon counts, or None when skipped
#[pyfunction]
#[pyo3(signature = (lat_path, lon_path, shapefile_path, output_path, tie_points = 21, overwrite = false))]
fn convert_osm_landmask_2_sar_geometry(
    lat_path: String,
    lon_path: String,
    shapefile_path: String,
    output_path: String,
    tie_points: usize,
    overwrite: bool,
) -> PyResult<Option<(usize, usize)>> {
    let params = LandmaskParams {
        tie_points,
        overwrite,
        ..Default::default()
    };

    let outcome =
        convert_landmask_to_sensor_geometry(lat_path, lon_path, shapefile_path, output_path, &params)
            .map_err(to_py_err)?;

    Ok(match outcome {
        LandmaskOutcome::Written { report, .. } => Some((report.rasterized, report.degenerate)),
        LandmaskOutcome::SkippedExisting(_) => None,
    })
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(get_tie_points_from_lat_lon, m)?)?;
    m.add_function(wrap_pyfunction!(py_geocode_image_from_lat_lon, m)?)?;
    m.add_function(wrap_pyfunction!(py_geocode_image_from_product_gcps, m)?)?;
    m.add_function(wrap_pyfunction!(convert_osm_landmask_2_sar_geometry, m)?)?;
    Ok(())
}

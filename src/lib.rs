//! geocoding: GCP-based geocoding of satellite imagery and sensor-geometry land masks
//!
//! Builds tie-point (GCP) grids from per-pixel lat/lon bands, embeds them into
//! rasters and warps the result with GDAL. The same GCPs drive an inverse
//! polynomial transform that maps land polygons into image geometry, where they
//! are rasterized into a water/land mask.

pub mod types;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    ControlPoint, ControlPointGrid, GeoArray, GeoError, GeoResult, ImageData, Polygon, PolygonLayer,
    RasterData, Shape, DEFAULT_TIE_POINTS, GEOGRAPHIC_EPSG,
};

pub use crate::core::{
    build_control_point_grid, convert_landmask_to_sensor_geometry, geocode_image_from_lat_lon,
    geocode_image_from_product_gcps, rasterize_layer_to_mask, GeometricTransform, GeocodingParams,
    LandmaskParams, MaskRaster, RasterizeReport,
};

pub use io::{GcpTransformer, Resampling, WarpOptions};

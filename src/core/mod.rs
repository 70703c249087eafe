//! Tie-point extraction, inverse-transform rasterization and the workflows built on them

pub mod tie_points;
pub mod transform;
pub mod rasterize;
pub mod geocode;
pub mod landmask;

// Re-export main types
pub use tie_points::{build_control_point_grid, sample_indices, sample_tie_points};
pub use transform::{AffineTransform, ArrayIndexed, GeometricTransform};
pub use rasterize::{rasterize_layer_to_mask, MaskRaster, RasterizeReport, LAND, WATER};
#[cfg(feature = "parallel")]
pub use rasterize::rasterize_layer_to_mask_parallel;
pub use geocode::{geocode_image_from_lat_lon, geocode_image_from_product_gcps, GeocodingOutcome, GeocodingParams};
pub use landmask::{convert_landmask_to_sensor_geometry, LandmaskOutcome, LandmaskParams};

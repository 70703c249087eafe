//! GDAL adapters for rasters, vectors, GCP transforms and warping

pub mod gcp;
pub mod raster;
pub mod srs;
pub mod vector;
pub mod warp;

pub use gcp::GcpTransformer;
pub use raster::{
    open_raster, raster_shape, read_control_points, read_image, read_raster_bands, write_image,
    write_raster,
};
pub use srs::spatial_reference_wkt;
pub use vector::{feature_count, open_vector_layer};
pub use warp::{warp_raster, Resampling, WarpOptions};

use crate::core::geocode::{prepare_output, require_input};
use crate::core::rasterize::{rasterize_layer_to_mask, RasterizeReport};
use crate::core::tie_points::build_control_point_grid;
use crate::core::transform::ArrayIndexed;
use crate::io::gcp::GcpTransformer;
use crate::io::raster::{open_raster, write_raster};
use crate::io::vector::open_vector_layer;
use crate::types::{GeoError, GeoResult, RasterData, DEFAULT_TIE_POINTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Driver used for mask output
pub const MASK_DRIVER: &str = "ENVI";

/// Land mask parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmaskParams {
    /// Number of tie points per dimension
    pub tie_points: usize,
    /// GCP polynomial order (0 lets GDAL choose from the GCP count)
    pub polynomial_order: u32,
    /// Replace an existing output file
    pub overwrite: bool,
}

impl Default for LandmaskParams {
    fn default() -> Self {
        Self {
            tie_points: DEFAULT_TIE_POINTS,
            polynomial_order: 0,
            overwrite: false,
        }
    }
}

impl LandmaskParams {
    pub fn validate(&self) -> GeoResult<()> {
        if self.tie_points < 2 {
            return Err(GeoError::InvalidConfiguration(format!(
                "tie_points must be at least 2, got {}",
                self.tie_points
            )));
        }
        if self.polynomial_order > 3 {
            return Err(GeoError::InvalidConfiguration(format!(
                "polynomial order must be 0-3, got {}",
                self.polynomial_order
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandmaskOutcome {
    Written {
        path: PathBuf,
        report: RasterizeReport,
    },
    SkippedExisting(PathBuf),
}

/// Rasterize land polygons into the sensor geometry of a lat/lon pair.
///
/// The mask is written as a single Byte band (water = 1, land = 0) with the
/// tie-point GCPs embedded. The layer is assumed to hold land polygons in
/// geographic lon/lat, as the OSM land-polygons shapefile does.
pub fn convert_landmask_to_sensor_geometry<P1, P2, P3, P4>(
    lat_path: P1,
    lon_path: P2,
    shapefile_path: P3,
    output_path: P4,
    params: &LandmaskParams,
) -> GeoResult<LandmaskOutcome>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
    P4: AsRef<Path>,
{
    let (lat_path, lon_path) = (lat_path.as_ref(), lon_path.as_ref());
    let shapefile_path = shapefile_path.as_ref();
    let output = output_path.as_ref();

    log::info!("Warping shapefile to sensor geometry landmask");
    log::debug!("lat_path:       {}", lat_path.display());
    log::debug!("lon_path:       {}", lon_path.display());
    log::debug!("shapefile_path: {}", shapefile_path.display());
    log::debug!("output_path:    {}", output.display());
    log::debug!("tie_points:     {}", params.tie_points);

    params.validate()?;
    require_input(lat_path, "lat_path")?;
    require_input(lon_path, "lon_path")?;
    require_input(shapefile_path, "shapefile_path")?;

    if !prepare_output(output, params.overwrite)? {
        return Ok(LandmaskOutcome::SkippedExisting(output.to_path_buf()));
    }

    let lat = open_raster(lat_path)?;
    let lon = open_raster(lon_path)?;
    let shape = lat.dim();

    let grid = build_control_point_grid(lat.view(), lon.view(), params.tie_points)?;
    let transformer = GcpTransformer::fit(&grid, params.polynomial_order)?;

    log::info!("Masking from input shapefile");
    log::info!("Resulting mask will be: water=1, land=0");

    let polygons = open_vector_layer(shapefile_path)?;
    let (mask, report) =
        rasterize_layer_to_mask(&ArrayIndexed(&transformer), &polygons, shape)?;

    write_raster(
        output,
        MASK_DRIVER,
        &RasterData::SingleBand(mask.into_bytes()),
        Some(&grid),
    )?;

    Ok(LandmaskOutcome::Written {
        path: output.to_path_buf(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = LandmaskParams::default();
        assert_eq!(params.tie_points, 21);
        assert_eq!(params.polynomial_order, 0);
        assert!(!params.overwrite);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_order() {
        let params = LandmaskParams {
            polynomial_order: 5,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(GeoError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_missing_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let lat = dir.path().join("lat.tif");
        std::fs::write(&lat, b"").unwrap();
        let result = convert_landmask_to_sensor_geometry(
            &lat,
            &lat,
            dir.path().join("land-polygons.shp"),
            dir.path().join("mask.img"),
            &LandmaskParams::default(),
        );
        assert!(matches!(result, Err(GeoError::NotFound(_))));
    }
}

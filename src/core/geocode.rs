use crate::core::tie_points::build_control_point_grid;
use crate::io::raster::{open_raster, read_control_points, read_image, write_image};
use crate::io::warp::{warp_raster, Resampling, WarpOptions};
use crate::types::{ControlPointGrid, GeoError, GeoResult, ImageData, DEFAULT_TIE_POINTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Geocoding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingParams {
    /// Number of tie points per dimension
    pub tie_points: usize,
    /// Polynomial order used by the warp (0 lets GDAL choose)
    pub polynomial_order: u32,
    pub resampling: Resampling,
    /// Source no-data value, None to disable
    pub src_nodata: Option<f64>,
    /// Output no-data value, None to disable
    pub dst_nodata: Option<f64>,
    /// Keep the intermediate GeoTIFF with embedded GCPs
    pub keep_gcp_file: bool,
    /// Replace an existing output file
    pub overwrite: bool,
}

impl Default for GeocodingParams {
    fn default() -> Self {
        Self {
            tie_points: DEFAULT_TIE_POINTS,
            polynomial_order: 3,
            resampling: Resampling::Nearest,
            src_nodata: Some(0.0),
            dst_nodata: Some(0.0),
            keep_gcp_file: false,
            overwrite: false,
        }
    }
}

impl GeocodingParams {
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

    fn warp_options(&self, target_epsg: u32, pixel_spacing: f64) -> WarpOptions {
        WarpOptions {
            target_epsg,
            pixel_spacing,
            resampling: self.resampling,
            polynomial_order: self.polynomial_order,
            src_nodata: self.src_nodata,
            dst_nodata: self.dst_nodata,
        }
    }
}

/// Result of a workflow that may leave an existing output alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodingOutcome {
    Written(PathBuf),
    SkippedExisting(PathBuf),
}

/// Fail with `NotFound` unless `path` exists
pub(crate) fn require_input(path: &Path, what: &str) -> GeoResult<()> {
    if !path.exists() {
        log::error!("Cannot find {}: {}", what, path.display());
        return Err(GeoError::NotFound(format!("{}: {}", what, path.display())));
    }
    Ok(())
}

/// Apply the overwrite policy; returns false when an existing output is kept
pub(crate) fn prepare_output(path: &Path, overwrite: bool) -> GeoResult<bool> {
    if path.is_file() {
        if !overwrite {
            log::info!("Output file already exists, use `overwrite` to force");
            return Ok(false);
        }
        log::info!("Removing existing output file");
        fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(true)
}

/// `<stem>_with_gcps.tiff` next to the output
pub fn gcp_tiff_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}_with_gcps.tiff", stem))
}

/// Intermediate file removed on drop unless kept
struct IntermediateFile {
    path: PathBuf,
    keep: bool,
}

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        if self.keep {
            log::info!("Keeping temporary tiff file with embedded GCPs");
            return;
        }
        if self.path.is_file() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn embed_and_warp(
    image: &ImageData,
    grid: &ControlPointGrid,
    output: &Path,
    target_epsg: u32,
    pixel_spacing: f64,
    params: &GeocodingParams,
) -> GeoResult<()> {
    let options = params.warp_options(target_epsg, pixel_spacing);
    options.validate()?;

    let gcp_path = gcp_tiff_path(output);
    log::debug!("tiff_path_with_gcps: {}", gcp_path.display());
    if gcp_path.is_file() {
        log::debug!("Removing existing tiff_path_with_gcps");
        fs::remove_file(&gcp_path)?;
    }

    let intermediate = IntermediateFile {
        path: gcp_path,
        keep: params.keep_gcp_file,
    };

    write_image(&intermediate.path, "GTiff", image, Some(grid))?;
    warp_raster(&intermediate.path, output, &options)
}

/// Geocode an image using GCPs sampled from its lat/lon bands.
///
/// Writes `<stem>_with_gcps.tiff` with the embedded GCPs and warps it to
/// `target_epsg` at `pixel_spacing`.
pub fn geocode_image_from_lat_lon<P1, P2, P3, P4>(
    img_path: P1,
    lat_path: P2,
    lon_path: P3,
    output_tiff_path: P4,
    target_epsg: u32,
    pixel_spacing: f64,
    params: &GeocodingParams,
) -> GeoResult<GeocodingOutcome>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
    P4: AsRef<Path>,
{
    let (img_path, lat_path, lon_path) = (img_path.as_ref(), lat_path.as_ref(), lon_path.as_ref());
    let output = output_tiff_path.as_ref();

    log::info!("Geocoding input image using lat/lon bands");
    log::debug!("img_path:         {}", img_path.display());
    log::debug!("lat_path:         {}", lat_path.display());
    log::debug!("lon_path:         {}", lon_path.display());
    log::debug!("output_tiff_path: {}", output.display());
    log::debug!("params:           {:?}", params);

    params.validate()?;
    require_input(img_path, "img_path")?;
    require_input(lat_path, "lat_path")?;
    require_input(lon_path, "lon_path")?;

    if !prepare_output(output, params.overwrite)? {
        return Ok(GeocodingOutcome::SkippedExisting(output.to_path_buf()));
    }

    let image = read_image(img_path)?;
    let lat = open_raster(lat_path)?;
    let lon = open_raster(lon_path)?;

    if image.shape() != Some(lat.dim()) {
        return Err(GeoError::InvalidData(format!(
            "image shape {:?} does not match lat/lon shape {:?}",
            image.shape(),
            lat.dim()
        )));
    }

    let grid = build_control_point_grid(lat.view(), lon.view(), params.tie_points)?;
    embed_and_warp(&image, &grid, output, target_epsg, pixel_spacing, params)?;

    Ok(GeocodingOutcome::Written(output.to_path_buf()))
}

/// Geocode an image using the GCPs embedded in its source product.
///
/// `product_path` is anything GDAL opens with GCPs attached, such as a
/// Sentinel-1 SAFE folder or manifest. `tie_points` is not used here.
pub fn geocode_image_from_product_gcps<P1, P2, P3>(
    img_path: P1,
    product_path: P2,
    output_tiff_path: P3,
    target_epsg: u32,
    pixel_spacing: f64,
    params: &GeocodingParams,
) -> GeoResult<GeocodingOutcome>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
{
    let (img_path, product_path) = (img_path.as_ref(), product_path.as_ref());
    let output = output_tiff_path.as_ref();

    log::info!("Geocoding input image using GCPs from product");
    log::debug!("img_path:         {}", img_path.display());
    log::debug!("product_path:     {}", product_path.display());
    log::debug!("output_tiff_path: {}", output.display());

    params.validate()?;
    require_input(img_path, "img_path")?;
    require_input(product_path, "product_path")?;

    if !prepare_output(output, params.overwrite)? {
        return Ok(GeocodingOutcome::SkippedExisting(output.to_path_buf()));
    }

    let image = read_image(img_path)?;
    let grid = read_control_points(product_path)?;
    embed_and_warp(&image, &grid, output, target_epsg, pixel_spacing, params)?;

    Ok(GeocodingOutcome::Written(output.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcp_tiff_path() {
        let path = gcp_tiff_path(Path::new("/data/out/S1A_HH_epsg3996.tiff"));
        assert_eq!(path, PathBuf::from("/data/out/S1A_HH_epsg3996_with_gcps.tiff"));
    }

    #[test]
    fn test_default_params() {
        let params = GeocodingParams::default();
        assert_eq!(params.tie_points, 21);
        assert_eq!(params.polynomial_order, 3);
        assert_eq!(params.resampling, Resampling::Nearest);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let params = GeocodingParams {
            tie_points: 1,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(GeoError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_prepare_output_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.tiff");

        assert!(prepare_output(&path, false).unwrap());
        assert!(path.parent().unwrap().is_dir());

        fs::write(&path, b"x").unwrap();
        assert!(!prepare_output(&path, false).unwrap());
        assert!(path.is_file());

        assert!(prepare_output(&path, true).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_intermediate_file_removed_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let removed = dir.path().join("a_with_gcps.tiff");
        let kept = dir.path().join("b_with_gcps.tiff");
        fs::write(&removed, b"x").unwrap();
        fs::write(&kept, b"x").unwrap();

        drop(IntermediateFile { path: removed.clone(), keep: false });
        drop(IntermediateFile { path: kept.clone(), keep: true });

        assert!(!removed.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let result = geocode_image_from_lat_lon(
            dir.path().join("img.img"),
            dir.path().join("lat.img"),
            dir.path().join("lon.img"),
            dir.path().join("out.tiff"),
            3996,
            40.0,
            &GeocodingParams::default(),
        );
        assert!(matches!(result, Err(GeoError::NotFound(_))));
    }

    #[test]
    fn test_product_without_gcps() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("img.tif");
        let band = ndarray::Array2::<f32>::ones((4, 4));
        crate::io::raster::write_raster(&img, "GTiff", &crate::types::RasterData::SingleBand(band), None)
            .unwrap();

        let result = geocode_image_from_product_gcps(
            &img,
            &img,
            dir.path().join("out.tiff"),
            4326,
            0.01,
            &GeocodingParams::default(),
        );
        assert!(matches!(result, Err(GeoError::InvalidData(_))));
    }
}

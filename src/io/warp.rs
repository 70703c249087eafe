use crate::io::gcp::last_gdal_error;
use crate::io::raster::open_dataset;
use crate::types::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;
use std::str::FromStr;

/// Resampling methods understood by GDAL warp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    #[serde(rename = "near")]
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
}

impl Default for Resampling {
    fn default() -> Self {
        Resampling::Nearest
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resampling::Nearest => "near",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
            Resampling::CubicSpline => "cubicspline",
            Resampling::Lanczos => "lanczos",
            Resampling::Average => "average",
            Resampling::Mode => "mode",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Resampling {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "near" | "nearest" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            "cubic" => Ok(Resampling::Cubic),
            "cubicspline" => Ok(Resampling::CubicSpline),
            "lanczos" => Ok(Resampling::Lanczos),
            "average" => Ok(Resampling::Average),
            "mode" => Ok(Resampling::Mode),
            _ => Err(GeoError::InvalidConfiguration(format!(
                "Invalid resampling method: {}",
                s
            ))),
        }
    }
}

/// Reprojection settings for a GCP-referenced raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpOptions {
    /// Output EPSG code
    pub target_epsg: u32,
    /// Output pixel spacing in target CRS units
    pub pixel_spacing: f64,
    pub resampling: Resampling,
    /// GCP polynomial order (0 lets GDAL choose)
    pub polynomial_order: u32,
    pub src_nodata: Option<f64>,
    pub dst_nodata: Option<f64>,
}

impl WarpOptions {
    pub fn validate(&self) -> GeoResult<()> {
        if !(self.pixel_spacing.is_finite() && self.pixel_spacing > 0.0) {
            return Err(GeoError::InvalidConfiguration(format!(
                "pixel_spacing must be positive, got {}",
                self.pixel_spacing
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

    /// Arguments in `gdalwarp` syntax
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-overwrite".to_string(),
            "-t_srs".to_string(),
            format!("EPSG:{}", self.target_epsg),
            "-tr".to_string(),
            self.pixel_spacing.to_string(),
            self.pixel_spacing.to_string(),
            "-r".to_string(),
            self.resampling.to_string(),
        ];
        if self.polynomial_order > 0 {
            args.push("-order".to_string());
            args.push(self.polynomial_order.to_string());
        }
        if let Some(nodata) = self.src_nodata {
            args.push("-srcnodata".to_string());
            args.push(nodata.to_string());
        }
        if let Some(nodata) = self.dst_nodata {
            args.push("-dstnodata".to_string());
            args.push(nodata.to_string());
        }
        args
    }
}

/// Warp a GCP-referenced raster to the target projection with GDAL in process
pub fn warp_raster<P, Q>(input: P, output: Q, options: &WarpOptions) -> GeoResult<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    options.validate()?;
    let args = options.to_args();

    log::info!(
        "Warping image to desired projection (EPSG:{})",
        options.target_epsg
    );
    log::debug!("gdalwarp {} {} {}", args.join(" "), input.as_ref().display(), output.as_ref().display());

    let source = open_dataset(input.as_ref())?;

    let c_args = args
        .iter()
        .map(|a| CString::new(a.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GeoError::InvalidConfiguration(format!("warp argument: {}", e)))?;
    let mut argv: Vec<*mut c_char> = c_args.iter().map(|a| a.as_ptr() as *mut c_char).collect();
    argv.push(ptr::null_mut());

    let dest = CString::new(output.as_ref().to_string_lossy().as_bytes())
        .map_err(|e| GeoError::InvalidConfiguration(format!("output path: {}", e)))?;

    unsafe {
        let warp_options = gdal_sys::GDALWarpAppOptionsNew(argv.as_mut_ptr(), ptr::null_mut());
        if warp_options.is_null() {
            return Err(GeoError::Warp(format!(
                "invalid warp options: {}",
                last_gdal_error()
            )));
        }

        let mut source_handle = source.c_dataset();
        let mut usage_error: c_int = 0;
        let warped = gdal_sys::GDALWarp(
            dest.as_ptr(),
            ptr::null_mut(),
            1,
            &mut source_handle,
            warp_options,
            &mut usage_error,
        );
        gdal_sys::GDALWarpAppOptionsFree(warp_options);

        if warped.is_null() {
            return Err(GeoError::Warp(format!(
                "GDALWarp failed for {} (usage error: {}): {}",
                input.as_ref().display(),
                usage_error != 0,
                last_gdal_error()
            )));
        }
        gdal_sys::GDALClose(warped);
    }

    Ok(())
}

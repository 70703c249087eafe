//! GDAL polynomial GCP transformer and GCP marshalling

use crate::core::transform::GeometricTransform;
use crate::types::{ControlPoint, ControlPointGrid, GeoError, GeoResult};
use gdal_sys::GDAL_GCP;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::NonNull;

/// Message of the last error GDAL raised on this thread
pub(crate) fn last_gdal_error() -> String {
    unsafe {
        let msg = gdal_sys::CPLGetLastErrorMsg();
        if msg.is_null() {
            String::new()
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}

/// GCPs in GDAL's C layout. Owns the strings the structs point into.
pub(crate) struct GdalGcpList {
    _ids: Vec<CString>,
    _info: CString,
    gcps: Vec<GDAL_GCP>,
}

impl GdalGcpList {
    pub(crate) fn new(points: &[ControlPoint]) -> Self {
        let info = CString::default();
        let ids: Vec<CString> = (1..=points.len())
            .map(|i| CString::new(i.to_string()).unwrap_or_default())
            .collect();

        let gcps = points
            .iter()
            .zip(&ids)
            .map(|(p, id)| GDAL_GCP {
                pszId: id.as_ptr() as *mut c_char,
                pszInfo: info.as_ptr() as *mut c_char,
                dfGCPPixel: p.pixel_x,
                dfGCPLine: p.pixel_y,
                dfGCPX: p.geo_x,
                dfGCPY: p.geo_y,
                dfGCPZ: p.elevation,
            })
            .collect();

        Self {
            _ids: ids,
            _info: info,
            gcps,
        }
    }

    pub(crate) fn len(&self) -> c_int {
        self.gcps.len() as c_int
    }

    pub(crate) fn as_ptr(&self) -> *const GDAL_GCP {
        self.gcps.as_ptr()
    }
}

/// Copy `count` GCPs out of GDAL-owned memory.
///
/// # Safety
/// `gcps` must point to at least `count` valid `GDAL_GCP` structs.
pub(crate) unsafe fn control_points_from_raw(gcps: *const GDAL_GCP, count: c_int) -> Vec<ControlPoint> {
    if gcps.is_null() || count <= 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(gcps, count as usize)
        .iter()
        .map(|g| ControlPoint {
            pixel_x: g.dfGCPPixel,
            pixel_y: g.dfGCPLine,
            geo_x: g.dfGCPX,
            geo_y: g.dfGCPY,
            elevation: g.dfGCPZ,
        })
        .collect()
}

/// Polynomial pixel <-> geo transform fitted by GDAL from a GCP grid.
///
/// The GDAL handle is destroyed on drop. Pixel coordinates are in the GCP
/// pixel/line space, i.e. the 1-based convention of the grid.
pub struct GcpTransformer {
    handle: NonNull<c_void>,
    order: u32,
    gcp_count: usize,
}

impl GcpTransformer {
    /// Fit a polynomial of `order` (1-3, or 0 to let GDAL pick from the GCP count)
    pub fn fit(grid: &ControlPointGrid, order: u32) -> GeoResult<Self> {
        if order > 3 {
            return Err(GeoError::InvalidConfiguration(format!(
                "polynomial order must be 0-3, got {}",
                order
            )));
        }
        if grid.len() < 3 {
            return Err(GeoError::TransformUnavailable(format!(
                "at least 3 GCPs are needed, got {}",
                grid.len()
            )));
        }

        log::debug!("Fitting order {} GCP transform to {} points", order, grid.len());

        let list = GdalGcpList::new(grid.points());
        let raw = unsafe {
            gdal_sys::GDALCreateGCPTransformer(list.len(), list.as_ptr(), order as c_int, 0)
        };

        NonNull::new(raw)
            .map(|handle| Self {
                handle,
                order,
                gcp_count: grid.len(),
            })
            .ok_or_else(|| {
                GeoError::TransformUnavailable(format!(
                    "GDAL could not fit an order {} polynomial to {} GCPs: {}",
                    order,
                    grid.len(),
                    last_gdal_error()
                ))
            })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn gcp_count(&self) -> usize {
        self.gcp_count
    }

    fn transform_point(&self, dst_to_src: bool, x: f64, y: f64) -> Option<(f64, f64)> {
        let (mut x, mut y, mut z) = (x, y, 0.0_f64);
        let mut success: c_int = 0;
        let status = unsafe {
            gdal_sys::GDALGCPTransform(
                self.handle.as_ptr(),
                dst_to_src as c_int,
                1,
                &mut x,
                &mut y,
                &mut z,
                &mut success,
            )
        };
        (status != 0 && success != 0 && x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

impl GeometricTransform for GcpTransformer {
    fn forward(&self, pixel_x: f64, pixel_y: f64) -> Option<(f64, f64)> {
        self.transform_point(false, pixel_x, pixel_y)
    }

    fn inverse(&self, geo_x: f64, geo_y: f64) -> Option<(f64, f64)> {
        self.transform_point(true, geo_x, geo_y)
    }
}

impl Drop for GcpTransformer {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALDestroyGCPTransformer(self.handle.as_ptr()) }
    }
}

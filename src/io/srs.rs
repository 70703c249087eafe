use crate::types::GeoResult;
use gdal::spatial_ref::SpatialRef;

/// WKT for an EPSG code (4326 = WGS84 geographic lat/lon)
pub fn spatial_reference_wkt(epsg: u32) -> GeoResult<String> {
    let srs = SpatialRef::from_epsg(epsg)?;
    Ok(srs.to_wkt()?)
}

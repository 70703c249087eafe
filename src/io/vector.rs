use crate::types::{GeoError, GeoResult, Polygon, PolygonLayer};
use gdal::vector::{Geometry, LayerAccess, OGRwkbGeometryType};
use gdal::Dataset;
use std::path::Path;

fn open_vector_dataset(path: &Path) -> GeoResult<Dataset> {
    if !path.exists() {
        log::error!("Cannot find vector file: {}", path.display());
        return Err(GeoError::NotFound(path.display().to_string()));
    }
    let dataset = Dataset::open(path)
        .map_err(|e| GeoError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;
    if dataset.layer_count() == 0 {
        return Err(GeoError::UnsupportedFormat(format!(
            "{} has no vector layers",
            path.display()
        )));
    }
    Ok(dataset)
}

/// Exterior rings of (multi)polygons; returns false for other geometry types
fn collect_exterior_rings(geometry: &Geometry, out: &mut PolygonLayer) -> bool {
    let geometry_type = unsafe { gdal_sys::OGR_GT_Flatten(geometry.geometry_type()) };

    if geometry_type == OGRwkbGeometryType::wkbPolygon {
        if geometry.geometry_count() > 0 {
            let ring = geometry.get_geometry(0);
            let vertices = ring
                .get_point_vec()
                .into_iter()
                .map(|(x, y, _)| (x, y))
                .collect();
            out.push(Polygon::new(vertices));
        }
        true
    } else if geometry_type == OGRwkbGeometryType::wkbMultiPolygon {
        for i in 0..geometry.geometry_count() {
            let part = geometry.get_geometry(i);
            collect_exterior_rings(&part, out);
        }
        true
    } else {
        false
    }
}

/// Polygons of the first layer, in layer order.
///
/// Each polygon contributes its exterior ring; each multipolygon part becomes
/// its own polygon. Holes are not carried.
pub fn open_vector_layer<P: AsRef<Path>>(path: P) -> GeoResult<PolygonLayer> {
    let dataset = open_vector_dataset(path.as_ref())?;
    let mut layer = dataset.layer(0)?;

    let mut polygons = PolygonLayer::new();
    let mut skipped = 0usize;
    for feature in layer.features() {
        match feature.geometry() {
            Some(geometry) => {
                if !collect_exterior_rings(geometry, &mut polygons) {
                    skipped += 1;
                }
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {} features without polygon geometry", skipped);
    }
    log::debug!(
        "Loaded {} polygons from {}",
        polygons.len(),
        path.as_ref().display()
    );
    Ok(polygons)
}

/// Number of features in the first layer
pub fn feature_count<P: AsRef<Path>>(path: P) -> GeoResult<usize> {
    let dataset = open_vector_dataset(path.as_ref())?;
    let layer = dataset.layer(0)?;
    Ok(layer.feature_count() as usize)
}

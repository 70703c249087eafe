use crate::io::srs::spatial_reference_wkt;
use crate::types::{ControlPoint, ControlPointGrid, GeoError, GeoResult, GEOGRAPHIC_EPSG};
use ndarray::ArrayView2;
use num_traits::ToPrimitive;

/// Evenly spaced indices over `[0, len - 1]`, both endpoints included.
///
/// Positions are rounded to the nearest index, so `count > len` repeats indices.
pub fn sample_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }

    let last = (len - 1) as f64;
    let step = last / (count - 1) as f64;
    (0..count)
        .map(|i| ((i as f64 * step).round() as usize).min(len - 1))
        .collect()
}

/// Sample paired lat/lon arrays on a `tie_points x tie_points` subgrid.
///
/// Points are ordered by sampled column (outer) then sampled row (inner).
pub fn sample_tie_points<T>(
    lat: ArrayView2<T>,
    lon: ArrayView2<T>,
    tie_points: usize,
) -> GeoResult<Vec<ControlPoint>>
where
    T: ToPrimitive + Copy,
{
    if lat.dim() != lon.dim() {
        log::error!("lat and lon arrays must have the same shape");
        return Err(GeoError::ShapeMismatch {
            lat: lat.dim(),
            lon: lon.dim(),
        });
    }
    if tie_points < 2 {
        return Err(GeoError::InvalidConfiguration(format!(
            "tie_points must be at least 2, got {}",
            tie_points
        )));
    }

    let (lines, samples) = lat.dim();
    if lines == 0 || samples == 0 {
        return Err(GeoError::InvalidConfiguration(format!(
            "lat/lon arrays are empty ({} x {})",
            lines, samples
        )));
    }
    log::debug!("number of lines-x-samples: {}-x-{}", lines, samples);

    if tie_points > lines.min(samples) {
        log::warn!(
            "{} tie points exceed image dimensions {}x{}; sampled rows/columns will repeat",
            tie_points,
            lines,
            samples
        );
    }

    let cols = sample_indices(samples, tie_points);
    let rows = sample_indices(lines, tie_points);

    let mut points = Vec::with_capacity(tie_points * tie_points);
    for &col in &cols {
        for &row in &rows {
            let geo_y = lat[[row, col]].to_f64().filter(|v| v.is_finite());
            let geo_x = lon[[row, col]].to_f64().filter(|v| v.is_finite());
            let (geo_x, geo_y) = match (geo_x, geo_y) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(GeoError::InvalidData(format!(
                        "non-finite lat/lon at row {}, col {}",
                        row, col
                    )))
                }
            };

            points.push(ControlPoint {
                pixel_x: col as f64 + 1.0,
                pixel_y: row as f64 + 1.0,
                geo_x,
                geo_y,
                elevation: 0.0,
            });
        }
    }

    Ok(points)
}

/// Build the GCP grid from lat/lon arrays, tagged with the EPSG:4326 WKT
pub fn build_control_point_grid<T>(
    lat: ArrayView2<T>,
    lon: ArrayView2<T>,
    tie_points: usize,
) -> GeoResult<ControlPointGrid>
where
    T: ToPrimitive + Copy,
{
    log::info!("Extracting tie points (GCPs) from lat/lon arrays");

    let points = sample_tie_points(lat, lon, tie_points)?;
    let wkt = spatial_reference_wkt(GEOGRAPHIC_EPSG)?;

    log::debug!("Extracted {} control points", points.len());
    Ok(ControlPointGrid::new(points, wkt))
}

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-pixel geographic coordinate grid (latitude or longitude), lines x samples
pub type GeoArray = Array2<f64>;

/// Raster shape as (lines, samples)
pub type Shape = (usize, usize);

/// Default number of tie points per image dimension
pub const DEFAULT_TIE_POINTS: usize = 21;

/// EPSG code of the geographic lat/lon system control points are expressed in
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// Ground control point tying a pixel position to a geographic position.
///
/// Pixel coordinates follow the 1-based convention used when GCPs are
/// embedded into a raster (`column + 1.0`, `row + 1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    /// Longitude for geographic grids
    pub geo_x: f64,
    /// Latitude for geographic grids
    pub geo_y: f64,
    pub elevation: f64,
}

/// Control points plus the WKT of the reference system of their geo coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPointGrid {
    points: Vec<ControlPoint>,
    wkt: String,
}

impl ControlPointGrid {
    pub fn new(points: Vec<ControlPoint>, wkt: String) -> Self {
        Self { points, wkt }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// WKT of the spatial reference the geographic coordinates are in
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Closed ring of (geo_x, geo_y) vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }
}

/// Polygons in source layer order
pub type PolygonLayer = Vec<Polygon>;

/// Band data resolved once at the read boundary
#[derive(Debug, Clone)]
pub enum RasterData<T> {
    SingleBand(Array2<T>),
    MultiBand(Vec<Array2<T>>),
}

impl<T> RasterData<T> {
    pub fn band_count(&self) -> usize {
        match self {
            RasterData::SingleBand(_) => 1,
            RasterData::MultiBand(bands) => bands.len(),
        }
    }

    /// (lines, samples) of the first band
    pub fn shape(&self) -> Option<Shape> {
        match self {
            RasterData::SingleBand(band) => Some(band.dim()),
            RasterData::MultiBand(bands) => bands.first().map(|b| b.dim()),
        }
    }

    pub fn bands(&self) -> Vec<&Array2<T>> {
        match self {
            RasterData::SingleBand(band) => vec![band],
            RasterData::MultiBand(bands) => bands.iter().collect(),
        }
    }

    /// Collapse a list of bands, keeping the single-band case distinct
    pub fn from_bands(mut bands: Vec<Array2<T>>) -> Self {
        if bands.len() == 1 {
            if let Some(band) = bands.pop() {
                return RasterData::SingleBand(band);
            }
        }
        RasterData::MultiBand(bands)
    }
}

/// Image bands kept in their on-disk sample type
#[derive(Debug, Clone)]
pub enum ImageData {
    UInt8(RasterData<u8>),
    UInt16(RasterData<u16>),
    Int16(RasterData<i16>),
    UInt32(RasterData<u32>),
    Int32(RasterData<i32>),
    Float32(RasterData<f32>),
    Float64(RasterData<f64>),
}

impl ImageData {
    pub fn band_count(&self) -> usize {
        match self {
            ImageData::UInt8(data) => data.band_count(),
            ImageData::UInt16(data) => data.band_count(),
            ImageData::Int16(data) => data.band_count(),
            ImageData::UInt32(data) => data.band_count(),
            ImageData::Int32(data) => data.band_count(),
            ImageData::Float32(data) => data.band_count(),
            ImageData::Float64(data) => data.band_count(),
        }
    }

    pub fn shape(&self) -> Option<Shape> {
        match self {
            ImageData::UInt8(data) => data.shape(),
            ImageData::UInt16(data) => data.shape(),
            ImageData::Int16(data) => data.shape(),
            ImageData::UInt32(data) => data.shape(),
            ImageData::Int32(data) => data.shape(),
            ImageData::Float32(data) => data.shape(),
            ImageData::Float64(data) => data.shape(),
        }
    }

    /// GDAL name of the sample type
    pub fn type_name(&self) -> &'static str {
        match self {
            ImageData::UInt8(_) => "Byte",
            ImageData::UInt16(_) => "UInt16",
            ImageData::Int16(_) => "Int16",
            ImageData::UInt32(_) => "UInt32",
            ImageData::Int32(_) => "Int32",
            ImageData::Float32(_) => "Float32",
            ImageData::Float64(_) => "Float64",
        }
    }
}

/// Error types for geocoding and masking
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Shape mismatch: lat is {lat:?}, lon is {lon:?}")]
    ShapeMismatch { lat: Shape, lon: Shape },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Transform unavailable: {0}")]
    TransformUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Warp failed: {0}")]
    Warp(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for geocoding operations
pub type GeoResult<T> = Result<T, GeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_data_from_bands() {
        let single = RasterData::from_bands(vec![Array2::<f32>::zeros((4, 6))]);
        assert!(matches!(single, RasterData::SingleBand(_)));
        assert_eq!(single.shape(), Some((4, 6)));

        let multi = RasterData::from_bands(vec![Array2::<f32>::zeros((4, 6)); 3]);
        assert_eq!(multi.band_count(), 3);
        assert_eq!(multi.bands().len(), 3);
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = GeoError::ShapeMismatch { lat: (5, 5), lon: (5, 6) };
        assert!(format!("{}", err).contains("(5, 6)"));
    }
}

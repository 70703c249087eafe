use crate::types::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};

/// Mapping between pixel space and geographic space.
///
/// Implementations report failure per point; callers drop points that fail.
pub trait GeometricTransform {
    /// pixel -> geo
    fn forward(&self, pixel_x: f64, pixel_y: f64) -> Option<(f64, f64)>;

    /// geo -> pixel
    fn inverse(&self, geo_x: f64, geo_y: f64) -> Option<(f64, f64)>;
}

impl<T: GeometricTransform + ?Sized> GeometricTransform for &T {
    fn forward(&self, pixel_x: f64, pixel_y: f64) -> Option<(f64, f64)> {
        (**self).forward(pixel_x, pixel_y)
    }

    fn inverse(&self, geo_x: f64, geo_y: f64) -> Option<(f64, f64)> {
        (**self).inverse(geo_x, geo_y)
    }
}

/// Six-coefficient affine transform in GDAL geotransform layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl AffineTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y
    }

    /// Fails with `TransformUnavailable` when the matrix cannot be inverted
    pub fn validate(&self) -> GeoResult<()> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return Err(GeoError::TransformUnavailable(format!(
                "affine transform is singular (determinant {})",
                det
            )));
        }
        Ok(())
    }
}

impl GeometricTransform for AffineTransform {
    fn forward(&self, pixel_x: f64, pixel_y: f64) -> Option<(f64, f64)> {
        let x = self.top_left_x + pixel_x * self.pixel_width + pixel_y * self.rotation_x;
        let y = self.top_left_y + pixel_x * self.rotation_y + pixel_y * self.pixel_height;
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    fn inverse(&self, geo_x: f64, geo_y: f64) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = geo_x - self.top_left_x;
        let dy = geo_y - self.top_left_y;
        let px = (self.pixel_height * dx - self.rotation_x * dy) / det;
        let py = (-self.rotation_y * dx + self.pixel_width * dy) / det;
        (px.is_finite() && py.is_finite()).then_some((px, py))
    }
}

/// Shifts the 1-based GCP pixel convention to 0-based array indices.
///
/// A geo position at a tie point maps back onto the lat/lon sample it came from.
#[derive(Debug, Clone, Copy)]
pub struct ArrayIndexed<G>(pub G);

impl<G: GeometricTransform> GeometricTransform for ArrayIndexed<G> {
    fn forward(&self, pixel_x: f64, pixel_y: f64) -> Option<(f64, f64)> {
        self.0.forward(pixel_x + 1.0, pixel_y + 1.0)
    }

    fn inverse(&self, geo_x: f64, geo_y: f64) -> Option<(f64, f64)> {
        self.0.inverse(geo_x, geo_y).map(|(x, y)| (x - 1.0, y - 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_affine_inverse_matches_forward() {
        let gt = AffineTransform::from_gdal([15.0, 0.02, 0.001, 70.0, -0.0005, -0.01]);
        gt.validate().unwrap();

        let (x, y) = gt.forward(123.0, 45.0).unwrap();
        let (px, py) = gt.inverse(x, y).unwrap();
        assert_relative_eq!(px, 123.0, epsilon = 1e-9);
        assert_relative_eq!(py, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_affine() {
        let gt = AffineTransform::from_gdal([0.0, 1.0, 2.0, 0.0, 0.5, 1.0]);
        assert!(matches!(gt.validate(), Err(GeoError::TransformUnavailable(_))));
        assert!(gt.inverse(1.0, 1.0).is_none());
    }

    #[test]
    fn test_array_indexed_offset() {
        let gt = AffineTransform::from_gdal([10.0, 1.0, 0.0, 20.0, 0.0, 1.0]);
        let indexed = ArrayIndexed(&gt);
        assert_eq!(indexed.inverse(11.0, 21.0), Some((0.0, 0.0)));
        assert_eq!(indexed.forward(0.0, 0.0), Some((11.0, 21.0)));
    }

    #[test]
    fn test_gdal_layout_roundtrip() {
        let raw = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(AffineTransform::from_gdal(raw).to_gdal(), raw);
    }
}

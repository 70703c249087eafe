use crate::core::transform::GeometricTransform;
use crate::types::{GeoError, GeoResult, Polygon, Shape};
use ndarray::{Array2, Zip};
use std::ops::AddAssign;

/// Mask value for background pixels
pub const WATER: bool = true;

/// Mask value for pixels covered by a polygon
pub const LAND: bool = false;

/// Land/water mask in sensor geometry (true = water, false = land)
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRaster {
    data: Array2<bool>,
}

/// Per-run counters for a rasterization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterizeReport {
    /// Polygons seen in the layer
    pub polygons: usize,
    /// Polygons filled into the mask
    pub rasterized: usize,
    /// Polygons left with fewer than 3 mappable vertices
    pub degenerate: usize,
    /// Vertices whose inverse mapping failed
    pub dropped_vertices: usize,
}

impl AddAssign for RasterizeReport {
    fn add_assign(&mut self, other: Self) {
        self.polygons += other.polygons;
        self.rasterized += other.rasterized;
        self.degenerate += other.degenerate;
        self.dropped_vertices += other.dropped_vertices;
    }
}

fn validate_shape(shape: Shape) -> GeoResult<()> {
    if shape.0 == 0 || shape.1 == 0 {
        return Err(GeoError::InvalidConfiguration(format!(
            "mask shape must be positive in both dimensions, got {:?}",
            shape
        )));
    }
    Ok(())
}

impl MaskRaster {
    /// All-water mask of the given (lines, samples)
    pub fn new(shape: Shape) -> GeoResult<Self> {
        validate_shape(shape)?;
        Ok(Self {
            data: Array2::from_elem(shape, WATER),
        })
    }

    pub fn shape(&self) -> Shape {
        self.data.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.data.get((row, col)).copied()
    }

    pub fn land_pixels(&self) -> usize {
        self.data.iter().filter(|&&v| v == LAND).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.data
    }

    /// Combine with another mask of the same shape; land in either stays land
    pub fn merge(&mut self, other: &MaskRaster) -> GeoResult<()> {
        if self.shape() != other.shape() {
            return Err(GeoError::InvalidConfiguration(format!(
                "cannot merge masks of shape {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        self.merge_land(other);
        Ok(())
    }

    fn merge_land(&mut self, other: &MaskRaster) {
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a = *a && b);
    }

    /// Fill a pixel-space polygon (boundary and interior) with land.
    ///
    /// Vertex `(x, y)` addresses column `x`, row `y`. Returns false when the
    /// ring has fewer than 3 vertices.
    pub fn fill_polygon(&mut self, vertices: &[(f64, f64)]) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        self.fill_interior(vertices);
        self.draw_outline(vertices);
        true
    }

    pub fn finalize(self) -> Array2<bool> {
        self.data
    }

    /// Byte mask for writing (water = 1, land = 0)
    pub fn into_bytes(self) -> Array2<u8> {
        self.data.mapv(u8::from)
    }

    fn set_land(&mut self, col: i64, row: i64) {
        let (lines, samples) = self.shape();
        if row >= 0 && col >= 0 && (row as usize) < lines && (col as usize) < samples {
            self.data[[row as usize, col as usize]] = LAND;
        }
    }

    /// Even-odd scanline fill sampled at integer pixel positions.
    ///
    /// Edges are sorted once by their lower y and moved through an active
    /// list as the scanline advances, so each row only visits the edges
    /// crossing it.
    fn fill_interior(&mut self, vertices: &[(f64, f64)]) {
        let (lines, samples) = self.shape();
        let mut edges = build_edge_table(vertices);
        if edges.is_empty() {
            return;
        }
        edges.sort_by(|a, b| a.y_lo.total_cmp(&b.y_lo));

        let min_y = edges[0].y_lo;
        let max_y = edges.iter().fold(f64::NEG_INFINITY, |hi, e| hi.max(e.y_hi));
        let first_row = min_y.ceil().max(0.0);
        let last_row = max_y.floor().min((lines - 1) as f64);
        if first_row > last_row {
            return;
        }

        let mut pending = edges.into_iter().peekable();
        let mut active: Vec<Edge> = Vec::new();
        let mut crossings: Vec<f64> = Vec::new();

        for row in first_row as usize..=last_row as usize {
            let y = row as f64;
            while let Some(edge) = pending.next_if(|e| e.y_lo <= y) {
                active.push(edge);
            }
            active.retain(|e| e.y_hi > y);

            crossings.clear();
            crossings.extend(active.iter().map(|e| e.x_at(y)));
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                let start = span[0].ceil().max(0.0);
                let end = span[1].floor().min((samples - 1) as f64);
                if start > end {
                    continue;
                }
                for col in start as usize..=end as usize {
                    self.data[[row, col]] = LAND;
                }
            }
        }
    }

    fn draw_outline(&mut self, vertices: &[(f64, f64)]) {
        let (lines, samples) = self.shape();
        let x_max = (samples - 1) as f64;
        let y_max = (lines - 1) as f64;
        let n = vertices.len();

        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
                continue;
            }
            if let Some((p0, p1)) = clip_segment(a, b, x_max, y_max) {
                self.draw_line(
                    (p0.0.round() as i64, p0.1.round() as i64),
                    (p1.0.round() as i64, p1.1.round() as i64),
                );
            }
        }
    }

    /// Bresenham line between two in-bounds pixels
    fn draw_line(&mut self, from: (i64, i64), to: (i64, i64)) {
        let (mut x, mut y) = from;
        let (x1, y1) = to;
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.set_land(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Non-horizontal polygon edge covering rows `y_lo <= y < y_hi`
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: (f64, f64),
    b: (f64, f64),
    y_lo: f64,
    y_hi: f64,
}

impl Edge {
    fn x_at(&self, y: f64) -> f64 {
        let (ax, ay) = self.a;
        let (bx, by) = self.b;
        ax + (y - ay) * (bx - ax) / (by - ay)
    }
}

fn build_edge_table(vertices: &[(f64, f64)]) -> Vec<Edge> {
    let n = vertices.len();
    (0..n)
        .filter_map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let finite = a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite();
            (finite && a.1 != b.1).then(|| Edge {
                a,
                b,
                y_lo: a.1.min(b.1),
                y_hi: a.1.max(b.1),
            })
        })
        .collect()
}

/// Liang-Barsky clip of a segment to `[0, x_max] x [0, y_max]`
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    x_max: f64,
    y_max: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let (x0, y0) = a;
    let dx = b.0 - x0;
    let dy = b.1 - y0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    Some((
        (x0 + t0 * dx, y0 + t0 * dy),
        (x0 + t1 * dx, y0 + t1 * dy),
    ))
}

/// Map polygon vertices to pixel space, dropping vertices that fail to map.
///
/// Returns the surviving pixel vertices and the number dropped.
pub fn polygon_to_pixels<G: GeometricTransform>(
    transform: &G,
    polygon: &Polygon,
) -> (Vec<(f64, f64)>, usize) {
    let mut pixels = Vec::with_capacity(polygon.vertices.len());
    let mut dropped = 0;
    for &(geo_x, geo_y) in &polygon.vertices {
        match transform.inverse(geo_x, geo_y) {
            Some((px, py)) if px.is_finite() && py.is_finite() => pixels.push((px, py)),
            _ => dropped += 1,
        }
    }
    (pixels, dropped)
}

fn rasterize_polygon<G: GeometricTransform>(
    transform: &G,
    polygon: &Polygon,
    mask: &mut MaskRaster,
    report: &mut RasterizeReport,
) {
    let (pixels, dropped) = polygon_to_pixels(transform, polygon);
    report.polygons += 1;
    report.dropped_vertices += dropped;

    if mask.fill_polygon(&pixels) {
        report.rasterized += 1;
    } else {
        report.degenerate += 1;
    }
}

fn log_report(report: &RasterizeReport) {
    log::info!(
        "Rasterized {} of {} polygons ({} vertices dropped)",
        report.rasterized,
        report.polygons,
        report.dropped_vertices
    );
    if report.degenerate > 0 {
        log::warn!(
            "Skipped {} polygons with fewer than 3 mappable vertices",
            report.degenerate
        );
    }
}

/// Rasterize a polygon layer into a water-background mask of `shape`.
///
/// Each vertex goes through `transform.inverse`; vertices that fail are
/// dropped and polygons left with fewer than 3 vertices are counted as
/// degenerate instead of aborting the run.
pub fn rasterize_layer_to_mask<G: GeometricTransform>(
    transform: &G,
    layer: &[Polygon],
    shape: Shape,
) -> GeoResult<(MaskRaster, RasterizeReport)> {
    let mut mask = MaskRaster::new(shape)?;
    let mut report = RasterizeReport::default();
    let n_features = layer.len();

    log::debug!("found {} features in layer", n_features);

    for (i, polygon) in layer.iter().enumerate() {
        if i % 10_000 == 0 {
            log::debug!("Processing feature {} of {}", i, n_features);
        }
        rasterize_polygon(transform, polygon, &mut mask, &mut report);
    }

    log_report(&report);
    Ok((mask, report))
}

/// Parallel variant of [`rasterize_layer_to_mask`].
///
/// Workers fill private masks which are merged with the land-wins rule, so the
/// result equals the sequential one.
#[cfg(feature = "parallel")]
pub fn rasterize_layer_to_mask_parallel<G: GeometricTransform + Sync>(
    transform: &G,
    layer: &[Polygon],
    shape: Shape,
) -> GeoResult<(MaskRaster, RasterizeReport)> {
    use rayon::prelude::*;

    let empty = MaskRaster::new(shape)?;
    log::debug!(
        "Rasterizing {} features on {} threads",
        layer.len(),
        rayon::current_num_threads()
    );

    let (mask, report) = layer
        .par_iter()
        .fold(
            || (empty.clone(), RasterizeReport::default()),
            |(mut mask, mut report), polygon| {
                rasterize_polygon(transform, polygon, &mut mask, &mut report);
                (mask, report)
            },
        )
        .reduce(
            || (empty.clone(), RasterizeReport::default()),
            |(mut mask, mut report), (other, other_report)| {
                mask.merge_land(&other);
                report += other_report;
                (mask, report)
            },
        );

    log_report(&report);
    Ok((mask, report))
}

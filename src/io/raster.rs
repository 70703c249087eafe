use crate::io::gcp::{control_points_from_raw, last_gdal_error, GdalGcpList};
use crate::types::{ControlPointGrid, GeoArray, GeoError, GeoResult, ImageData, RasterData, Shape};
use gdal::raster::{Buffer, GdalDataType, GdalType};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::ffi::{CStr, CString};
use std::path::Path;

/// Open a raster dataset, reporting a missing path as `NotFound`
pub fn open_dataset<P: AsRef<Path>>(path: P) -> GeoResult<Dataset> {
    let path = path.as_ref();
    if !path.exists() {
        log::error!("Cannot find raster: {}", path.display());
        return Err(GeoError::NotFound(path.display().to_string()));
    }
    Dataset::open(path).map_err(|e| {
        GeoError::UnsupportedFormat(format!("{}: {}", path.display(), e))
    })
}

/// Read one band (1-based) into a lines x samples array
pub fn read_band<T: GdalType + Copy>(dataset: &Dataset, band_index: usize) -> GeoResult<Array2<T>> {
    let (width, height) = dataset.raster_size();
    let rasterband = dataset.rasterband(band_index as isize)?;
    let buffer = rasterband.read_as::<T>((0, 0), (width, height), (width, height), None)?;

    Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| GeoError::InvalidData(format!("Failed to reshape band {}: {}", band_index, e)))
}

/// Read band 1 of a raster as f64 (lat/lon grids)
pub fn open_raster<P: AsRef<Path>>(path: P) -> GeoResult<GeoArray> {
    log::debug!("Reading raster: {}", path.as_ref().display());
    let dataset = open_dataset(path)?;
    read_band::<f64>(&dataset, 1)
}

/// Read every band of a raster as `T`
pub fn read_raster_bands<T, P>(path: P) -> GeoResult<RasterData<T>>
where
    T: GdalType + Copy,
    P: AsRef<Path>,
{
    let dataset = open_dataset(path.as_ref())?;
    read_all_bands(&dataset, path.as_ref())
}

fn read_all_bands<T: GdalType + Copy>(dataset: &Dataset, path: &Path) -> GeoResult<RasterData<T>> {
    let band_count = dataset.raster_count() as usize;
    if band_count == 0 {
        return Err(GeoError::InvalidData(format!(
            "{} has no raster bands",
            path.display()
        )));
    }
    log::debug!("Reading {} band(s) from {}", band_count, path.display());

    let bands = (1..=band_count)
        .map(|i| read_band::<T>(dataset, i))
        .collect::<GeoResult<Vec<_>>>()?;
    Ok(RasterData::from_bands(bands))
}

/// Read every band in the sample type of band 1.
///
/// Types without a variant (8-bit signed, 64-bit integer, complex) are read
/// as Float64.
pub fn read_image<P: AsRef<Path>>(path: P) -> GeoResult<ImageData> {
    let path = path.as_ref();
    let dataset = open_dataset(path)?;
    let band_type = dataset.rasterband(1)?.band_type();

    let image = match band_type {
        GdalDataType::UInt8 => ImageData::UInt8(read_all_bands(&dataset, path)?),
        GdalDataType::UInt16 => ImageData::UInt16(read_all_bands(&dataset, path)?),
        GdalDataType::Int16 => ImageData::Int16(read_all_bands(&dataset, path)?),
        GdalDataType::UInt32 => ImageData::UInt32(read_all_bands(&dataset, path)?),
        GdalDataType::Int32 => ImageData::Int32(read_all_bands(&dataset, path)?),
        GdalDataType::Float32 => ImageData::Float32(read_all_bands(&dataset, path)?),
        GdalDataType::Float64 => ImageData::Float64(read_all_bands(&dataset, path)?),
        other => {
            log::warn!(
                "Reading {} band type {:?} as Float64",
                path.display(),
                other
            );
            ImageData::Float64(read_all_bands(&dataset, path)?)
        }
    };
    log::debug!("Image sample type: {}", image.type_name());
    Ok(image)
}

/// (lines, samples) of a raster
pub fn raster_shape<P: AsRef<Path>>(path: P) -> GeoResult<Shape> {
    let dataset = open_dataset(path)?;
    let (width, height) = dataset.raster_size();
    Ok((height, width))
}

fn embed_control_points(dataset: &Dataset, grid: &ControlPointGrid) -> GeoResult<()> {
    let list = GdalGcpList::new(grid.points());
    let wkt = CString::new(grid.wkt())
        .map_err(|e| GeoError::InvalidData(format!("GCP projection WKT: {}", e)))?;

    let err = unsafe {
        gdal_sys::GDALSetGCPs(dataset.c_dataset(), list.len(), list.as_ptr(), wkt.as_ptr())
    };
    if err != gdal_sys::CPLErr::CE_None {
        return Err(GeoError::UnsupportedFormat(format!(
            "Failed to embed GCPs: {}",
            last_gdal_error()
        )));
    }
    Ok(())
}

/// Write bands with the named GDAL driver, optionally embedding GCPs
pub fn write_raster<T, P>(
    path: P,
    driver_name: &str,
    data: &RasterData<T>,
    control_points: Option<&ControlPointGrid>,
) -> GeoResult<()>
where
    T: GdalType + Copy,
    P: AsRef<Path>,
{
    let (height, width) = data
        .shape()
        .ok_or_else(|| GeoError::InvalidData("no bands to write".to_string()))?;
    let bands = data.bands();
    if bands.iter().any(|b| b.dim() != (height, width)) {
        return Err(GeoError::InvalidData(
            "all bands must share the same shape".to_string(),
        ));
    }

    log::info!(
        "Writing {} band(s) of {}x{} to {} ({})",
        bands.len(),
        height,
        width,
        path.as_ref().display(),
        driver_name
    );

    let driver = DriverManager::get_driver_by_name(driver_name)?;
    let dataset = driver.create_with_band_type::<T, _>(
        path.as_ref(),
        width as isize,
        height as isize,
        bands.len() as isize,
    )?;

    for (i, band_data) in bands.into_iter().enumerate() {
        let mut rasterband = dataset.rasterband((i + 1) as isize)?;
        let flat_data: Vec<T> = band_data.iter().copied().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
    }

    if let Some(grid) = control_points {
        log::debug!("Embedding {} GCPs", grid.len());
        embed_control_points(&dataset, grid)?;
    }

    Ok(())
}

/// Write an image keeping its sample type
pub fn write_image<P: AsRef<Path>>(
    path: P,
    driver_name: &str,
    image: &ImageData,
    control_points: Option<&ControlPointGrid>,
) -> GeoResult<()> {
    match image {
        ImageData::UInt8(data) => write_raster(path, driver_name, data, control_points),
        ImageData::UInt16(data) => write_raster(path, driver_name, data, control_points),
        ImageData::Int16(data) => write_raster(path, driver_name, data, control_points),
        ImageData::UInt32(data) => write_raster(path, driver_name, data, control_points),
        ImageData::Int32(data) => write_raster(path, driver_name, data, control_points),
        ImageData::Float32(data) => write_raster(path, driver_name, data, control_points),
        ImageData::Float64(data) => write_raster(path, driver_name, data, control_points),
    }
}

/// GCPs already embedded in a raster or product (e.g. a Sentinel-1 SAFE)
pub fn read_control_points<P: AsRef<Path>>(path: P) -> GeoResult<ControlPointGrid> {
    let dataset = open_dataset(path.as_ref())?;

    let (points, wkt) = unsafe {
        let handle = dataset.c_dataset();
        let count = gdal_sys::GDALGetGCPCount(handle);
        let points = control_points_from_raw(gdal_sys::GDALGetGCPs(handle), count);
        let projection = gdal_sys::GDALGetGCPProjection(handle);
        let wkt = if projection.is_null() {
            String::new()
        } else {
            CStr::from_ptr(projection).to_string_lossy().into_owned()
        };
        (points, wkt)
    };

    if points.is_empty() {
        return Err(GeoError::InvalidData(format!(
            "{} carries no GCPs",
            path.as_ref().display()
        )));
    }
    log::info!("Read {} GCPs from {}", points.len(), path.as_ref().display());

    Ok(ControlPointGrid::new(points, wkt))
}

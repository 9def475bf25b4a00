use crate::error::{ProcessingError, Result};
use crate::models::{GeoTransform, PixelType, RasterImage, RasterMeta};
use crate::utils::constants::*;
use memmap2::Mmap;
use ndarray::Array3;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{ChunkType, Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

/// Band-stacked raster storage the clipper reads from.
pub trait RasterSource {
    /// Identifies the source in diagnostics.
    fn name(&self) -> String;

    /// Materialize the full band stack.
    fn load(&self) -> Result<RasterImage>;
}

/// Decodes GeoTIFF files into band-stacked integer arrays.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffReader;

impl GeoTiffReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the whole file. The file is memory-mapped for the duration of the call.
    pub fn read(&self, path: &Path) -> Result<RasterImage> {
        let file = File::open(path).map_err(|e| {
            ProcessingError::Data(format!("Cannot open raster {}: {}", path.display(), e))
        })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
            ProcessingError::Data(format!("Cannot map raster {}: {}", path.display(), e))
        })?;

        let mut decoder = Self::decoder(Cursor::new(&mmap[..]))?;
        let (width, height) = decoder.dimensions()?;
        let (rows, cols) = (height as usize, width as usize);

        let samples = samples_per_pixel(&mut decoder)?;
        let planar = is_planar(&mut decoder)?;
        let geo = read_geo_metadata(&mut decoder, path)?;

        // read_image only decodes the first plane of a band-sequential file
        let (values, pixel_type) = if planar {
            read_planes(&mut decoder, path, rows, cols, samples)?
        } else {
            widen(decoder.read_image()?)?
        };
        let pixels = rows * cols;
        if pixels == 0 || values.len() % pixels != 0 {
            return Err(ProcessingError::Data(format!(
                "{}: {} samples do not fill a {}x{} grid",
                path.display(),
                values.len(),
                rows,
                cols
            )));
        }
        let bands = values.len() / pixels;
        if bands != samples {
            return Err(ProcessingError::Data(format!(
                "{}: decoded {} of {} bands",
                path.display(),
                bands,
                samples
            )));
        }

        let data = if planar {
            Array3::from_shape_vec((bands, rows, cols), values)?
        } else {
            Array3::from_shape_vec((rows, cols, bands), values)?
                .permuted_axes([2, 0, 1])
                .as_standard_layout()
                .into_owned()
        };

        let meta = RasterMeta::new(cols, rows, bands, pixel_type)
            .with_transform(geo.transform)
            .with_nodata(geo.nodata)
            .with_epsg(geo.epsg);

        debug!(
            path = %path.display(),
            bands,
            rows,
            cols,
            pixel_type = %pixel_type,
            epsg = ?geo.epsg,
            "decoded raster"
        );

        RasterImage::new(data, meta)
    }

    /// Header-only read: dimensions, band count, sample type and georeferencing.
    pub fn read_meta(&self, path: &Path) -> Result<RasterMeta> {
        let file = File::open(path).map_err(|e| {
            ProcessingError::Data(format!("Cannot open raster {}: {}", path.display(), e))
        })?;
        let mut decoder = Self::decoder(file)?;
        let (width, height) = decoder.dimensions()?;

        let samples = samples_per_pixel(&mut decoder)?;
        let pixel_type = header_pixel_type(&mut decoder, path)?;
        let geo = read_geo_metadata(&mut decoder, path)?;

        Ok(
            RasterMeta::new(width as usize, height as usize, samples, pixel_type)
                .with_transform(geo.transform)
                .with_nodata(geo.nodata)
                .with_epsg(geo.epsg),
        )
    }

    fn decoder<R: Read + Seek>(reader: R) -> Result<Decoder<R>> {
        Ok(Decoder::new(reader)?.with_limits(Limits::unlimited()))
    }
}

/// A GeoTIFF on disk. The file handle lives only inside each `load` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoTiffFile {
    path: PathBuf,
}

impl GeoTiffFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_meta(&self) -> Result<RasterMeta> {
        GeoTiffReader::new().read_meta(&self.path)
    }
}

impl RasterSource for GeoTiffFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RasterImage> {
        GeoTiffReader::new().read(&self.path)
    }
}

impl RasterSource for RasterImage {
    fn name(&self) -> String {
        "in-memory raster".to_string()
    }

    fn load(&self) -> Result<RasterImage> {
        Ok(self.clone())
    }
}

struct GeoMetadata {
    transform: GeoTransform,
    epsg: Option<u32>,
    nodata: Option<i32>,
}

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn read_geo_metadata<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<GeoMetadata> {
    let transform = read_transform(decoder)?.ok_or_else(|| {
        ProcessingError::Data(format!("{} has no georeferencing tags", path.display()))
    })?;
    if transform.is_degenerate() {
        return Err(ProcessingError::Data(format!(
            "{} has a degenerate geotransform",
            path.display()
        )));
    }

    let epsg = match decoder.find_tag(geo_tag(TAG_GEO_KEY_DIRECTORY))? {
        Some(value) => epsg_from_geokeys(&value.into_u16_vec()?),
        None => None,
    };

    let nodata = match decoder.find_tag(geo_tag(TAG_GDAL_NODATA))? {
        Some(value) => parse_nodata(&value.into_string()?, path),
        None => None,
    };

    Ok(GeoMetadata {
        transform,
        epsg,
        nodata,
    })
}

fn f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(geo_tag(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    if let Some(m) = f64_tag(decoder, TAG_MODEL_TRANSFORMATION)? {
        if m.len() >= 16 {
            return Ok(Some(GeoTransform {
                origin_x: m[3],
                origin_y: m[7],
                pixel_width: m[0],
                pixel_height: m[5],
                row_rotation: m[1],
                col_rotation: m[4],
            }));
        }
    }

    let scale = f64_tag(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = f64_tag(decoder, TAG_MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // tiepoint: [I, J, K, X, Y, Z]
            let origin_x = tie[3] - tie[0] * scale[0];
            let origin_y = tie[4] + tie[1] * scale[1];
            Ok(Some(GeoTransform::new(
                origin_x, origin_y, scale[0], -scale[1],
            )))
        }
        _ => Ok(None),
    }
}

/// EPSG code declared in a GeoKeyDirectory; the projected CRS wins over the geographic one.
pub fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut projected = None;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        // Values stored elsewhere (location != 0) are never EPSG codes.
        if entry[1] != 0 {
            continue;
        }
        match entry[0] {
            GEOKEY_PROJECTED_CS_TYPE => projected = Some(u32::from(entry[3])),
            GEOKEY_GEOGRAPHIC_TYPE => geographic = Some(u32::from(entry[3])),
            _ => {}
        }
    }

    // 32767 is "user-defined"
    projected
        .filter(|&c| c != 32767)
        .or(geographic.filter(|&c| c != 32767))
}

fn parse_nodata(raw: &str, path: &Path) -> Option<i32> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
            Some(v as i32)
        }
        _ => {
            warn!(path = %path.display(), nodata = trimmed, "ignoring non-integer nodata tag");
            None
        }
    }
}

fn samples_per_pixel<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize> {
    Ok(decoder
        .find_tag(Tag::SamplesPerPixel)?
        .map(|v| v.into_u16())
        .transpose()?
        .map_or(1, usize::from))
}

fn is_planar<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<bool> {
    Ok(decoder
        .find_tag(Tag::PlanarConfiguration)?
        .map(|v| v.into_u16())
        .transpose()?
        == Some(2))
}

fn header_pixel_type<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<PixelType> {
    let bits = decoder
        .find_tag(Tag::BitsPerSample)?
        .map(|v| v.into_u16_vec())
        .transpose()?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let format = decoder
        .find_tag(Tag::SampleFormat)?
        .map(|v| v.into_u16_vec())
        .transpose()?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);

    match (bits, format) {
        (8, 1) => Ok(PixelType::U8),
        (8, 2) => Ok(PixelType::I8),
        (16, 1) => Ok(PixelType::U16),
        (16, 2) => Ok(PixelType::I16),
        (32, 1) => Ok(PixelType::U32),
        (32, 2) => Ok(PixelType::I32),
        _ => Err(ProcessingError::Data(format!(
            "{}: unsupported sample type ({} bits, format {})",
            path.display(),
            bits,
            format
        ))),
    }
}

/// Decode a band-sequential file plane by plane into one band-major buffer.
///
/// Chunks are stored plane-major: chunk `band * per_band + i` holds the
/// `i`-th strip or tile of `band`, laid out row by row across the grid.
fn read_planes<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
    rows: usize,
    cols: usize,
    bands: usize,
) -> Result<(Vec<i32>, PixelType)> {
    let chunks = match decoder.get_chunk_type() {
        ChunkType::Strip => decoder.strip_count()?,
        ChunkType::Tile => decoder.tile_count()?,
    } as usize;
    if bands == 0 || chunks == 0 || chunks % bands != 0 {
        return Err(ProcessingError::Data(format!(
            "{}: {} chunks cannot be split into {} bands",
            path.display(),
            chunks,
            bands
        )));
    }
    let per_band = chunks / bands;

    let (chunk_width, chunk_height) = decoder.chunk_dimensions();
    let (chunk_width, chunk_height) = (chunk_width as usize, chunk_height as usize);
    if chunk_width == 0 || chunk_height == 0 {
        return Err(ProcessingError::Data(format!(
            "{}: empty chunk dimensions",
            path.display()
        )));
    }
    let across = cols.div_ceil(chunk_width);

    let plane_len = rows * cols;
    let mut values = vec![0i32; bands * plane_len];
    let mut pixel_type = None;

    for (band, plane) in values.chunks_exact_mut(plane_len).enumerate() {
        for i in 0..per_band {
            let index = (band * per_band + i) as u32;
            let (chunk, chunk_type) = widen(decoder.read_chunk(index)?)?;
            pixel_type = Some(chunk_type);

            let row0 = (i / across) * chunk_height;
            let col0 = (i % across) * chunk_width;
            if row0 >= rows || col0 >= cols {
                return Err(ProcessingError::Data(format!(
                    "{}: chunk {} lies outside the {}x{} grid",
                    path.display(),
                    index,
                    rows,
                    cols
                )));
            }
            let width = chunk_width.min(cols - col0);
            let height = chunk_height.min(rows - row0);
            // Tiles past the first plane can come back with their bottom padding
            if chunk.len() % width != 0 || chunk.len() / width < height {
                return Err(ProcessingError::Data(format!(
                    "{}: chunk {} holds {} samples, expected {}",
                    path.display(),
                    index,
                    chunk.len(),
                    width * height
                )));
            }

            for (r, line) in chunk.chunks_exact(width).take(height).enumerate() {
                let start = (row0 + r) * cols + col0;
                plane[start..start + width].copy_from_slice(line);
            }
        }
    }

    let pixel_type = pixel_type.ok_or_else(|| {
        ProcessingError::Data(format!("{}: no image data", path.display()))
    })?;
    Ok((values, pixel_type))
}

/// Widen decoded samples to `i32`.
fn widen(result: DecodingResult) -> Result<(Vec<i32>, PixelType)> {
    let widened = match result {
        DecodingResult::U8(buf) => (buf.into_iter().map(i32::from).collect(), PixelType::U8),
        DecodingResult::I8(buf) => (buf.into_iter().map(i32::from).collect(), PixelType::I8),
        DecodingResult::U16(buf) => (buf.into_iter().map(i32::from).collect(), PixelType::U16),
        DecodingResult::I16(buf) => (buf.into_iter().map(i32::from).collect(), PixelType::I16),
        DecodingResult::I32(buf) => (buf, PixelType::I32),
        DecodingResult::U32(buf) => {
            let values = buf
                .into_iter()
                .map(|v| {
                    i32::try_from(v).map_err(|_| {
                        ProcessingError::Data(format!("uint32 sample {} exceeds the int32 range", v))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            (values, PixelType::U32)
        }
        DecodingResult::F32(_) | DecodingResult::F64(_) => {
            return Err(ProcessingError::Data(
                "Floating-point rasters are not supported".to_string(),
            ))
        }
        _ => {
            return Err(ProcessingError::Data(
                "64-bit integer rasters are not supported".to_string(),
            ))
        }
    };
    Ok(widened)
}

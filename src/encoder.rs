//! PNG 输出：RGB555 展开、编码、去除辅助块

use crate::config::{ImageCompression, ImageConfig};
use crate::error::{ConversionError, IoResultExt, Result};
use crate::raster::{Raster, PAINTED};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// PNG 文件签名
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// 长度 + 类型 + CRC
const CHUNK_OVERHEAD: usize = 12;

#[inline]
fn expand5(v: u16) -> u8 {
    let v = (v & 0x1F) as u8;
    (v << 3) | (v >> 2)
}

/// RGB555 -> RGB888
pub fn rgb555_to_rgb8(pixel: u16) -> [u8; 3] {
    [expand5(pixel >> 10), expand5(pixel >> 5), expand5(pixel)]
}

/// 不透明 RGB8
pub fn to_rgb8(raster: &Raster) -> Vec<u8> {
    let mut out = Vec::with_capacity(raster.pixels().len() * 3);
    for &p in raster.pixels() {
        out.extend_from_slice(&rgb555_to_rgb8(p));
    }
    out
}

/// RGBA8，alpha 取自已绘制标记位
pub fn to_rgba8(raster: &Raster) -> Vec<u8> {
    let mut out = Vec::with_capacity(raster.pixels().len() * 4);
    for &p in raster.pixels() {
        out.extend_from_slice(&rgb555_to_rgb8(p));
        out.push(if p & PAINTED != 0 { 0xFF } else { 0 });
    }
    out
}

fn compression_type(c: ImageCompression) -> CompressionType {
    match c {
        ImageCompression::Fast => CompressionType::Fast,
        ImageCompression::Default => CompressionType::Default,
        ImageCompression::Best => CompressionType::Best,
    }
}

/// 编码为标准 PNG 字节流（未精简）
pub fn encode_png(raster: &Raster, config: &ImageConfig) -> Result<Vec<u8>> {
    let size = raster.size() as u32;
    let (data, color) = if config.transparent_background {
        (to_rgba8(raster), ColorType::Rgba8)
    } else {
        (to_rgb8(raster), ColorType::Rgb8)
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(
        &mut out,
        compression_type(config.compression),
        FilterType::Adaptive,
    )
    .write_image(&data, size, size, color)
    .map_err(|e| ConversionError::Io {
        context: "编码图像".to_string(),
        source: io::Error::new(io::ErrorKind::Other, e),
    })?;
    Ok(out)
}

/// 类型标签第一个字节的第 5 位为 0 表示关键块
pub fn is_critical(chunk_type: &[u8; 4]) -> bool {
    chunk_type[0] & 0x20 == 0
}

/// 只保留签名和关键块
pub fn strip_ancillary_chunks(png: &[u8]) -> Result<Vec<u8>> {
    if png.len() < PNG_SIGNATURE.len() || png[..8] != PNG_SIGNATURE {
        return Err(ConversionError::Format("PNG 签名无效".to_string()));
    }

    let mut out = Vec::with_capacity(png.len());
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut pos = PNG_SIGNATURE.len();
    while pos < png.len() {
        if pos + 8 > png.len() {
            return Err(ConversionError::Format(format!("PNG 块头被截断 (偏移 {})", pos)));
        }
        let length = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let total = length + CHUNK_OVERHEAD;
        if pos + total > png.len() {
            return Err(ConversionError::Format(format!("PNG 块被截断 (偏移 {})", pos)));
        }

        let chunk_type = [png[pos + 4], png[pos + 5], png[pos + 6], png[pos + 7]];
        if is_critical(&chunk_type) {
            out.extend_from_slice(&png[pos..pos + total]);
        }
        pos += total;
    }

    Ok(out)
}

/// 编码并写入 PNG
///
/// 先写到同目录的临时文件再重命名，目标路径上不会出现写了一半的文件。
pub fn write_png(raster: &Raster, path: &Path, config: &ImageConfig) -> Result<()> {
    let png = strip_ancillary_chunks(&encode_png(raster, config)?)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let persist = || -> io::Result<()> {
        // 出错时 NamedTempFile 在 drop 时自行删除
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&png)?;
        tmp.persist(path)?;
        Ok(())
    };
    persist().io_context(|| format!("写入 {}", path.display()))
}

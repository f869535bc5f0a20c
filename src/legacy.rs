//! 旧版单文件地图（`.map`，版本 3）解析

use crate::chunk::{decode_samples, paint_chunk, ChunkCoord, CHUNK_BYTES};
use crate::error::{ConversionError, IoResultExt, Result};
use crate::progress::Progress;
use crate::raster::Raster;
use std::io::{BufReader, Read, Seek, SeekFrom};

/// 文件魔数
pub const MAGIC: &[u8; 4] = b"map\0";

/// 唯一支持的版本
pub const LEGACY_VERSION: u8 = 3;

/// 颜色数据段相对 `max_chunks * 4` 的固定偏移
const COLOR_DATA_BASE: i64 = 0x10;

/// 文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyHeader {
    pub version: u8,
    pub max_chunks: i32,
    pub num_chunks: i32,
}

impl LegacyHeader {
    /// 颜色数据段起始位置
    pub fn color_data_offset(&self) -> i64 {
        COLOR_DATA_BASE + self.max_chunks as i64 * 4
    }

    /// 负数当作空地图
    pub fn chunk_count(&self) -> usize {
        self.num_chunks.max(0) as usize
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> std::io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// 读取并校验文件头
pub fn read_legacy_header<R: Read + Seek>(reader: &mut R) -> Result<LegacyHeader> {
    let magic: [u8; 4] = read_array(reader).io_context(|| "读取文件头")?;
    if &magic != MAGIC {
        return Err(ConversionError::Format(format!("无效的魔数 {:02x?}", magic)));
    }

    let [version] = read_array::<_, 1>(reader).io_context(|| "读取文件头")?;
    if version != LEGACY_VERSION {
        return Err(ConversionError::UnsupportedVersion {
            version: version as u32,
            file: None,
        });
    }

    // 3 个保留字节
    reader
        .seek(SeekFrom::Current(3))
        .io_context(|| "读取文件头")?;
    let max_chunks = i32::from_le_bytes(read_array(reader).io_context(|| "读取文件头")?);
    let num_chunks = i32::from_le_bytes(read_array(reader).io_context(|| "读取文件头")?);

    Ok(LegacyHeader {
        version,
        max_chunks,
        num_chunks,
    })
}

/// 坐标表预分配上限，文件头里的数量不可信
const COORD_PREALLOC: usize = 1 << 16;

/// 读取旧版地图并画进缓冲区
///
/// 跳过越界区块时用 `seek_relative`，不会丢弃读缓冲。
pub fn read_legacy_map<R: Read + Seek>(
    reader: &mut BufReader<R>,
    raster: &mut Raster,
    progress: &mut dyn Progress,
) -> Result<LegacyHeader> {
    progress.on_status("Reading header");
    let header = read_legacy_header(reader)?;
    let count = header.chunk_count();

    progress.on_status("Reading chunk coordinates");
    progress.on_stage_start(count);
    let mut coords = Vec::with_capacity(count.min(COORD_PREALLOC));
    for i in 0..count {
        let packed = u32::from_le_bytes(read_array(reader).io_context(|| "读取区块坐标")?);
        coords.push(ChunkCoord::unpack(packed));
        progress.on_progress(i + 1);
    }

    // 坐标表之后到 max_chunks 为止是未使用的空间
    let offset = header.color_data_offset();
    if offset < 0 {
        return Err(ConversionError::Io {
            context: "定位颜色数据".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("颜色数据偏移为负 ({})", offset),
            ),
        });
    }
    reader
        .seek(SeekFrom::Start(offset as u64))
        .io_context(|| "定位颜色数据")?;

    progress.on_status("Reading colour data and painting image");
    progress.on_stage_start(count);
    let mut block = [0u8; CHUNK_BYTES];
    for (i, coord) in coords.iter().enumerate() {
        if raster.contains_chunk(coord.cx, coord.cy) {
            reader
                .read_exact(&mut block)
                .io_context(|| format!("读取区块 ({}, {}) 颜色数据", coord.cx, coord.cy))?;
            paint_chunk(raster, *coord, &decode_samples(&block));
        } else {
            reader
                .seek_relative(CHUNK_BYTES as i64)
                .io_context(|| format!("跳过区块 ({}, {})", coord.cx, coord.cy))?;
        }
        progress.on_progress(i + 1);
    }

    Ok(header)
}

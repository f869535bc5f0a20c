//! 区域文件（`r.<x>.<y>.7rm`，版本 1）解析

use crate::chunk::{decode_samples, is_empty_block, paint_chunk, ChunkCoord, CHUNK_BYTES};
use crate::error::{ConversionError, IoResultExt, Result};
use crate::progress::Progress;
use crate::raster::Raster;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// 区域文件扩展名
pub const REGION_EXTENSION: &str = "7rm";

/// 唯一支持的区域文件版本
pub const REGION_VERSION: u32 = 1;

/// 每个区域的边长（区块）
pub const REGION_CHUNKS: i32 = 32;

static REGION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^r\.([+-]?\d+)\.([+-]?\d+)\.7rm$").expect("valid region pattern"));

/// 一个区域文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFile {
    pub path: PathBuf,
    pub rx: i32,
    pub ry: i32,
}

impl RegionFile {
    /// 区域左下角的区块坐标，溢出 i32 时返回 None
    ///
    /// 原点能放进 i32 时，加上区域内偏移 `0..32` 也不会溢出。
    pub fn origin(&self) -> Option<ChunkCoord> {
        Some(ChunkCoord::new(
            self.rx.checked_mul(REGION_CHUNKS)?,
            self.ry.checked_mul(REGION_CHUNKS)?,
        ))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// 解析区域文件名，返回 (rx, ry)
pub fn parse_region_filename(filename: &str) -> Option<(i32, i32)> {
    let caps = REGION_FILENAME.captures(filename)?;
    let rx = caps.get(1)?.as_str().parse().ok()?;
    let ry = caps.get(2)?.as_str().parse().ok()?;
    Some((rx, ry))
}

/// 列出目录下所有区域文件，按 (ry, rx) 排序
///
/// 只看扩展名为 `.7rm` 的文件；其中文件名不符合 `r.<x>.<y>.7rm` 的视为格式错误。
pub fn list_region_files(dir: &Path) -> Result<Vec<RegionFile>> {
    let context = || format!("读取目录 {}", dir.display());
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).io_context(context)? {
        let path = entry.io_context(context)?.path();
        if !path.is_file() {
            continue;
        }
        let is_region = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(REGION_EXTENSION));
        if !is_region {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (rx, ry) = parse_region_filename(&name)
            .ok_or_else(|| ConversionError::Format(format!("无效的区域文件名: {}", name)))?;
        let region = RegionFile { path, rx, ry };
        if region.origin().is_none() {
            return Err(ConversionError::Format(format!("区域坐标超出范围: {}", name)));
        }
        files.push(region);
    }

    files.sort_by_key(|f| (f.ry, f.rx));
    Ok(files)
}

/// 读取单个区域文件并画进缓冲区，返回绘制的区块数
pub fn read_region_file(region: &RegionFile, raster: &mut Raster) -> Result<usize> {
    let name = region.file_name();
    let origin = region
        .origin()
        .ok_or_else(|| ConversionError::Format(format!("区域坐标超出范围: {}", name)))?;
    let mut file = File::open(&region.path).io_context(|| format!("打开 {}", name))?;

    let mut version = [0u8; 4];
    file.read_exact(&mut version)
        .io_context(|| format!("读取 {} 的版本号", name))?;
    let version = u32::from_le_bytes(version);
    if version != REGION_VERSION {
        return Err(ConversionError::UnsupportedVersion {
            version,
            file: Some(name),
        });
    }

    let mut decoder = GzDecoder::new(file);
    let mut block = [0u8; CHUNK_BYTES];
    let mut painted = 0;

    for y in 0..REGION_CHUNKS {
        for x in 0..REGION_CHUNKS {
            decoder
                .read_exact(&mut block)
                .io_context(|| format!("解压 {}", name))?;

            // 全零区块表示未探索
            if is_empty_block(&block) {
                continue;
            }
            let coord = ChunkCoord::new(origin.cx + x, origin.cy + y);
            if !raster.contains_chunk(coord.cx, coord.cy) {
                continue;
            }
            paint_chunk(raster, coord, &decode_samples(&block));
            painted += 1;
        }
    }

    Ok(painted)
}

/// 读取整个区域目录
///
/// 每处理完一个文件汇报一次进度，逐区块汇报会明显拖慢速度。
pub fn read_region_dir(dir: &Path, raster: &mut Raster, progress: &mut dyn Progress) -> Result<usize> {
    progress.on_status("Reading region files");
    let files = list_region_files(dir)?;
    progress.on_stage_start(files.len());

    let mut painted = 0;
    for (i, region) in files.iter().enumerate() {
        painted += read_region_file(region, raster)?;
        progress.on_progress(i + 1);
    }
    Ok(painted)
}

/// 区域目录概况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSummary {
    pub count: usize,
    pub min: (i32, i32),
    pub max: (i32, i32),
}

pub fn summarize(files: &[RegionFile]) -> Option<RegionSummary> {
    let first = files.first()?;
    let mut summary = RegionSummary {
        count: files.len(),
        min: (first.rx, first.ry),
        max: (first.rx, first.ry),
    };
    for f in files {
        summary.min = (summary.min.0.min(f.rx), summary.min.1.min(f.ry));
        summary.max = (summary.max.0.max(f.rx), summary.max.1.max(f.ry));
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::CHUNK_SAMPLES;
    use crate::progress::NoProgress;
    use crate::raster::MAP_SIZE;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    /// 生成区域文件，`filled` 中的 (x, y) 区块填充为指定颜色
    fn region_bytes(version: u32, filled: &[(i32, i32, u16)]) -> Vec<u8> {
        let mut body = vec![0u8; (REGION_CHUNKS * REGION_CHUNKS) as usize * CHUNK_BYTES];
        for &(x, y, color) in filled {
            let start = ((y * REGION_CHUNKS + x) as usize) * CHUNK_BYTES;
            for i in 0..CHUNK_SAMPLES {
                body[start + i * 2..start + i * 2 + 2].copy_from_slice(&color.to_le_bytes());
            }
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&body).unwrap();

        let mut data = version.to_le_bytes().to_vec();
        data.extend(encoder.finish().unwrap());
        data
    }

    #[test]
    fn filename_parsing() {
        assert_eq!(parse_region_filename("r.0.0.7rm"), Some((0, 0)));
        assert_eq!(parse_region_filename("r.-3.+2.7rm"), Some((-3, 2)));
        assert_eq!(parse_region_filename("r.12.-1.7rm"), Some((12, -1)));
        assert_eq!(parse_region_filename("r.a.0.7rm"), None);
        assert_eq!(parse_region_filename("x.r.0.0.7rm"), None);
        assert_eq!(parse_region_filename("r.0.7rm"), None);
        assert_eq!(parse_region_filename("r.0.0.7rm.bak"), None);
        assert_eq!(parse_region_filename("r.99999999999.0.7rm"), None);
        assert_eq!(parse_region_filename("R.1.-2.7RM"), Some((1, -2)));
    }

    #[test]
    fn bad_filename_fails_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.0.0.7rm"), region_bytes(1, &[])).unwrap();
        fs::write(dir.path().join("backup.7rm"), b"junk").unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let err = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap_err();
        match err {
            ConversionError::Format(msg) => assert!(msg.contains("backup.7rm")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_extensions_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.0.0.7rm"), region_bytes(1, &[(0, 0, 0x0042)])).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let files = list_region_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn wrong_version_names_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.1.-1.7rm"), region_bytes(2, &[])).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let err = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap_err();
        match err {
            ConversionError::UnsupportedVersion { version, file } => {
                assert_eq!(version, 2);
                assert_eq!(file.as_deref(), Some("r.1.-1.7rm"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_blocks_are_not_painted() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("r.-1.0.7rm"),
            region_bytes(1, &[(3, 5, 0x0000), (4, 5, 0x7FFF)]),
        )
        .unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let painted = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap();
        assert_eq!(painted, 1);
        assert_eq!(raster.painted_count(), CHUNK_SAMPLES);

        // 区域 (-1, 0) 的原点是区块 (-32, 0)
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(raster.pixels()[raster.pixel_index(-29, 5, x, y)], 0);
                assert_eq!(raster.pixels()[raster.pixel_index(-28, 5, x, y)], 0xFFFF);
            }
        }
    }

    #[test]
    fn zero_color_in_nonempty_block_is_painted() {
        let dir = TempDir::new().unwrap();
        // 第一个样本非零，其余为零
        let mut body = vec![0u8; (REGION_CHUNKS * REGION_CHUNKS) as usize * CHUNK_BYTES];
        body[0] = 1;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&body).unwrap();
        let mut bytes = REGION_VERSION.to_le_bytes().to_vec();
        bytes.extend(encoder.finish().unwrap());
        fs::write(dir.path().join("r.0.0.7rm"), bytes).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap();
        assert_eq!(raster.painted_count(), CHUNK_SAMPLES);
        assert_eq!(raster.pixels()[raster.pixel_index(0, 0, 0, 0)], 0x8001);
        assert_eq!(raster.pixels()[raster.pixel_index(0, 0, 1, 0)], 0x8000);
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut bytes = region_bytes(1, &[(1, 1, 0x1234)]);
        bytes.truncate(bytes.len() / 2);
        fs::write(dir.path().join("r.0.0.7rm"), bytes).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let err = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap_err();
        match err {
            ConversionError::Io { context, .. } => assert!(context.contains("r.0.0.7rm")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn progress_is_per_file() {
        use crate::progress::ProgressHooks;

        let dir = TempDir::new().unwrap();
        for name in ["r.0.0.7rm", "r.1.0.7rm", "r.0.-1.7rm"] {
            fs::write(dir.path().join(name), region_bytes(1, &[(0, 0, 5)])).unwrap();
        }

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let mut stages = Vec::new();
        let mut values = Vec::new();
        {
            let mut hooks = ProgressHooks::new()
                .stage_start(|max| stages.push(max))
                .progress(|v| values.push(v));
            read_region_dir(dir.path(), &mut raster, &mut hooks).unwrap();
        }
        assert_eq!(stages, vec![3]);
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn files_are_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["r.1.0.7rm", "r.0.0.7rm", "r.5.-2.7rm"] {
            fs::write(dir.path().join(name), region_bytes(1, &[])).unwrap();
        }
        let files = list_region_files(dir.path()).unwrap();
        let coords: Vec<_> = files.iter().map(|f| (f.rx, f.ry)).collect();
        assert_eq!(coords, vec![(5, -2), (0, 0), (1, 0)]);

        let summary = summarize(&files).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, (0, -2));
        assert_eq!(summary.max, (5, 0));
    }

    #[test]
    fn regions_outside_small_raster_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.3.0.7rm"), region_bytes(1, &[(0, 0, 9)])).unwrap();

        let mut raster = Raster::new(64).unwrap();
        let painted = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap();
        assert_eq!(painted, 0);
        assert_eq!(raster.painted_count(), 0);
    }

    #[test]
    fn uppercase_names_are_accepted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("R.0.0.7RM"), region_bytes(1, &[(2, 3, 0x0123)])).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let painted = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap();
        assert_eq!(painted, 1);
        assert_eq!(raster.pixels()[raster.pixel_index(2, 3, 0, 0)], 0x8123);
    }

    #[test]
    fn huge_region_index_is_format_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.100000000.0.7rm"), region_bytes(1, &[])).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let err = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap_err();
        match err {
            ConversionError::Format(msg) => assert!(msg.contains("r.100000000.0.7rm")),
            other => panic!("unexpected error: {other:?}"),
        }

        let region = RegionFile {
            path: dir.path().join("r.100000000.0.7rm"),
            rx: 100_000_000,
            ry: 0,
        };
        assert!(region.origin().is_none());
        assert!(matches!(
            read_region_file(&region, &mut raster),
            Err(ConversionError::Format(_))
        ));
    }

    #[test]
    fn largest_representable_region_does_not_overflow() {
        let rx = i32::MAX / REGION_CHUNKS;
        let dir = TempDir::new().unwrap();
        let name = format!("r.{}.{}.7rm", rx, -rx - 1);
        fs::write(dir.path().join(&name), region_bytes(1, &[(31, 0, 0x0001)])).unwrap();

        let mut raster = Raster::new(MAP_SIZE).unwrap();
        let painted = read_region_dir(dir.path(), &mut raster, &mut NoProgress).unwrap();
        assert_eq!(painted, 0);
    }
}

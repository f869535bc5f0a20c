//! 地图文件 -> PNG

use crate::config::Config;
use crate::encoder::write_png;
use crate::error::{IoResultExt, Result};
use crate::legacy::{read_legacy_header, read_legacy_map, LegacyHeader};
use crate::progress::Progress;
use crate::raster::Raster;
use crate::region::{list_region_files, read_region_dir, summarize, RegionSummary, REGION_EXTENSION};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// 单个 `.map` 文件
    Legacy,
    /// 一个目录下的 `.7rm` 区域文件
    Region,
}

impl MapFormat {
    /// 按扩展名判断，其他一律按旧格式处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case(REGION_EXTENSION) => Self::Region,
            _ => Self::Legacy,
        }
    }
}

/// 区域文件所在目录
pub fn region_dir(input: &Path) -> &Path {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// 使用默认配置转换
pub fn convert(input: &Path, output: &Path, progress: &mut dyn Progress) -> Result<()> {
    convert_with_config(input, output, &Config::default(), progress)
}

/// 使用配置转换
///
/// 解码失败时不会写输出文件。
pub fn convert_with_config(
    input: &Path,
    output: &Path,
    config: &Config,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut raster = Raster::new(config.map.size)?;

    match MapFormat::from_path(input) {
        MapFormat::Region => {
            read_region_dir(region_dir(input), &mut raster, progress)?;
        }
        MapFormat::Legacy => {
            let file = File::open(input).io_context(|| format!("打开 {}", input.display()))?;
            read_legacy_map(&mut BufReader::new(file), &mut raster, progress)?;
        }
    }

    progress.on_status("Saving image");
    write_png(&raster, output, &config.image)?;

    progress.on_status("Done!");
    progress.on_stage_start(1);
    Ok(())
}

/// 地图文件概况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapInfo {
    Legacy(LegacyHeader),
    Region(Option<RegionSummary>),
}

/// 只读文件头 / 文件列表，不解码颜色数据
pub fn inspect(input: &Path) -> Result<MapInfo> {
    match MapFormat::from_path(input) {
        MapFormat::Region => {
            let files = list_region_files(region_dir(input))?;
            Ok(MapInfo::Region(summarize(&files)))
        }
        MapFormat::Legacy => {
            let file = File::open(input).io_context(|| format!("打开 {}", input.display()))?;
            Ok(MapInfo::Legacy(read_legacy_header(&mut BufReader::new(file))?))
        }
    }
}

//! 世界地图像素缓冲区

use crate::chunk::CHUNK_SIZE;
use crate::error::{ConversionError, Result};

/// 默认地图边长（Navezgane 的尺寸）
pub const MAP_SIZE: usize = 6144;

/// 已绘制标记位
pub const PAINTED: u16 = 0x8000;

/// 正方形像素网格，每个像素为 RGB555 + 已绘制标记位
pub struct Raster {
    size: usize,
    pixels: Vec<u16>,
}

impl Raster {
    /// 创建 `size * size` 的全零缓冲区
    ///
    /// `size` 必须是 32 的非零倍数，这样区块坐标范围 `[-size/32, size/32)` 正好铺满整张图。
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || size % (CHUNK_SIZE * 2) != 0 {
            return Err(ConversionError::InvalidMapSize(size));
        }
        Ok(Self {
            size,
            pixels: vec![0; size * size],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// 按图像坐标取像素（行从上往下）
    pub fn get(&self, px: usize, py: usize) -> u16 {
        self.pixels[px + py * self.size]
    }

    /// 写入一个像素并打上已绘制标记
    #[inline]
    pub fn paint(&mut self, index: usize, raw: u16) {
        self.pixels[index] = raw | PAINTED;
    }

    /// 区块坐标的有效范围是 `[-max_chunk, max_chunk)`
    pub fn max_chunk(&self) -> i32 {
        (self.size / CHUNK_SIZE / 2) as i32
    }

    /// 区块是否完整落在图内
    pub fn contains_chunk(&self, cx: i32, cy: i32) -> bool {
        let max = self.max_chunk();
        (-max..max).contains(&cx) && (-max..max).contains(&cy)
    }

    /// 世界坐标 -> 缓冲区下标
    ///
    /// 原点移到图中心，并翻转 Y 轴（世界 Y 向上，图像行向下）。
    #[inline]
    pub fn pixel_index(&self, cx: i32, cy: i32, x: usize, y: usize) -> usize {
        let size = self.size as i64;
        let px = x as i64 + cx as i64 * CHUNK_SIZE as i64 + size / 2;
        let py = size - 1 - (y as i64 + cy as i64 * CHUNK_SIZE as i64 + size / 2);
        (px + py * size) as usize
    }

    /// 已绘制像素数量
    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p & PAINTED != 0).count()
    }
}

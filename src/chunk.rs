//! 区块颜色数据与绘制

use crate::raster::Raster;

/// 区块边长（像素）
pub const CHUNK_SIZE: usize = 16;

/// 每个区块的样本数
pub const CHUNK_SAMPLES: usize = CHUNK_SIZE * CHUNK_SIZE;

/// 每个区块颜色数据的字节数
pub const CHUNK_BYTES: usize = CHUNK_SAMPLES * 2;

/// 区块坐标，(0, 0) 为地图中心
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// 解包旧格式中的 32 位坐标：低 16 位为 cx，高 16 位为 cy，均按 i16 解释
    pub fn unpack(packed: u32) -> Self {
        Self {
            cx: (packed & 0xFFFF) as u16 as i16 as i32,
            cy: (packed >> 16) as u16 as i16 as i32,
        }
    }

    pub fn pack(self) -> u32 {
        (self.cx as i16 as u16 as u32) | ((self.cy as i16 as u16 as u32) << 16)
    }
}

/// 把 512 字节的区块数据解码为 256 个小端 u16 样本
pub fn decode_samples(block: &[u8; CHUNK_BYTES]) -> [u16; CHUNK_SAMPLES] {
    let mut samples = [0u16; CHUNK_SAMPLES];
    for (sample, bytes) in samples.iter_mut().zip(block.chunks_exact(2)) {
        *sample = u16::from_le_bytes([bytes[0], bytes[1]]);
    }
    samples
}

/// 全零区块表示未探索
pub fn is_empty_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// 把一个区块的样本画进缓冲区
///
/// 样本按行优先排列（y 外层，x 内层）。调用方负责保证区块在图内。
pub fn paint_chunk(raster: &mut Raster, coord: ChunkCoord, samples: &[u16; CHUNK_SAMPLES]) {
    for y in 0..CHUNK_SIZE {
        // 同一行的像素在缓冲区里是连续的
        let row = raster.pixel_index(coord.cx, coord.cy, 0, y);
        for x in 0..CHUNK_SIZE {
            raster.paint(row + x, samples[y * CHUNK_SIZE + x]);
        }
    }
}

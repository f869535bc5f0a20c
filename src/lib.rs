//! 7 Days to Die 地图转 PNG 工具
//!
//! 支持旧版单文件地图（`.map`，版本 3）和区域分片地图（`r.x.y.7rm`，版本 1）

pub mod chunk;
pub mod config;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod legacy;
pub mod progress;
pub mod raster;
pub mod region;

pub use config::Config;
pub use convert::{convert, convert_with_config, inspect, MapFormat, MapInfo};
pub use error::{ConversionError, Result};
pub use progress::{NoProgress, Progress, ProgressHooks};
pub use raster::{Raster, MAP_SIZE};

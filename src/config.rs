//! 配置文件加载与管理

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::raster::MAP_SIZE;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 地图配置
    pub map: MapConfig,
    /// 输出图像配置
    pub image: ImageConfig,
}

/// 地图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// 地图边长（像素），两种格式的越界判断都由它推出
    pub size: usize,
}

/// PNG 压缩等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCompression {
    Fast,
    Default,
    Best,
}

/// 输出图像配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 压缩等级
    pub compression: ImageCompression,
    /// 未绘制的像素输出为透明
    pub transparent_background: bool,
}

// ============== 默认值 ==============

impl Default for MapConfig {
    fn default() -> Self {
        Self { size: MAP_SIZE }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            compression: ImageCompression::Best,
            transparent_background: false,
        }
    }
}

// ============== 配置加载 ==============

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sdmap").join("config.toml"))
    }

    /// 按优先级加载配置：
    /// 1. 当前目录的 sdmap.toml
    /// 2. 用户配置目录的 config.toml
    /// 3. 默认配置
    pub fn load() -> Self {
        let local_config = Path::new("sdmap.toml");
        if local_config.exists() {
            match Self::load_from_file(local_config) {
                Ok(config) => {
                    log::info!("已加载配置: sdmap.toml");
                    return config;
                }
                Err(e) => log::warn!("无法加载配置 sdmap.toml: {}", e),
            }
        }

        if let Some(user_config) = Self::default_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("已加载配置: {}", user_config.display());
                        return config;
                    }
                    Err(e) => log::warn!("无法加载配置 {}: {}", user_config.display(), e),
                }
            }
        }

        Self::default()
    }

    /// 生成默认配置文件内容
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

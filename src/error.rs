//! 转换过程中的错误类型

use std::io;
use thiserror::Error;

/// 地图转换错误
#[derive(Error, Debug)]
pub enum ConversionError {
    /// 文件格式错误（魔数不对、区域文件名无效等）
    #[error("格式错误: {0}")]
    Format(String),

    /// 版本号存在但不受支持
    #[error("不支持的文件格式版本 ({version}){}", file_suffix(.file))]
    UnsupportedVersion { version: u32, file: Option<String> },

    /// 底层读写 / 解压失败
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// 地图尺寸必须是 32 的非零倍数
    #[error("无效的地图尺寸: {0}（必须是 32 的非零倍数）")]
    InvalidMapSize(usize),
}

fn file_suffix(file: &Option<String>) -> String {
    match file {
        Some(name) => format!(" - {}", name),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// 给 `io::Result` 附加阶段信息
pub trait IoResultExt<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|source| ConversionError::Io {
            context: f().into(),
            source,
        })
    }
}

//! 存储与配置错误

use std::path::PathBuf;
use thiserror::Error;

/// JSON 文档存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件读写失败
    #[error("I/O error on {path}: {source}")]
    Io {
        /// 文件路径
        path: PathBuf,
        /// 底层错误
        #[source]
        source: std::io::Error,
    },

    /// JSON 编解码失败
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 条目不存在
    #[error("'{0}' not found")]
    NotFound(String),

    /// 条目已存在
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    /// 条目内容不合法
    #[error("Invalid entry: {0}")]
    Invalid(String),
}

/// 配置文件错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读写失败
    #[error("Failed to access config {path}: {source}")]
    Io {
        /// 文件路径
        path: PathBuf,
        /// 底层错误
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 区域管理错误类型
//! Error types for zone authoring and persistence

use std::io;
use thiserror::Error;

/// Result type alias for zone operations.
pub type Result<T> = std::result::Result<T, ZoneError>;

#[derive(Debug, Error)]
pub enum ZoneError {
    /// 区域名称已存在 (缓冲区保留,用户可以改名重试)
    #[error("zone name already exists: {0}")]
    DuplicateName(String),

    /// 顶点数量未达到上限时尝试命名
    #[error("zone needs {expected} points, only {got} placed")]
    IncompleteZone { expected: usize, got: usize },

    /// 少于3个顶点的多边形
    #[error("zone {name} has {got} vertices, at least 3 required")]
    InvalidZone { name: String, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

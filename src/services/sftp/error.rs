// 远程文件操作错误

use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// 文件网关错误
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// 路径超出允许的根目录
    #[error("Path is outside the permitted root: {0}")]
    OutsideRoot(String),

    #[error("File too large: {size} bytes (max {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Target already exists: {0}")]
    TargetExists(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Parent directory does not exist: {0}")]
    ParentMissing(String),

    #[error("No space left on device: {0}")]
    NoSpace(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// SFTP 通道已关闭或连接丢失
    #[error("SFTP connection lost: {0}")]
    ConnectionLost(String),

    #[error("{0}")]
    Other(String),
}

impl FsError {
    /// 将 russh-sftp 错误映射为网关错误
    pub fn from_sftp(err: SftpErrorInner, path: &str) -> Self {
        if let SftpErrorInner::Status(status) = &err {
            match status.status_code {
                StatusCode::NoSuchFile => return FsError::NotFound(path.to_string()),
                StatusCode::PermissionDenied => {
                    return FsError::PermissionDenied(path.to_string())
                }
                StatusCode::NoConnection | StatusCode::ConnectionLost => {
                    return FsError::ConnectionLost(status.error_message.clone())
                }
                _ => {}
            }
        }
        Self::from_message(err.to_string(), path)
    }

    /// 按错误文本归类（服务器的 Failure 状态只带文字说明）
    pub fn from_message(message: String, path: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("no such file") || lower.contains("not found") {
            FsError::NotFound(path.to_string())
        } else if lower.contains("permission denied") {
            FsError::PermissionDenied(path.to_string())
        } else if lower.contains("no space") || lower.contains("quota") {
            FsError::NoSpace(path.to_string())
        } else {
            FsError::Other(format!("{}: {}", path, message))
        }
    }

    /// 本地 IO 错误（读写流）映射
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            _ => Self::from_message(err.to_string(), path),
        }
    }
}

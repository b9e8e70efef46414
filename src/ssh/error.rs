// SSH 错误类型定义

use thiserror::Error;

/// SSH 错误类型
#[derive(Debug, Error)]
pub enum SshError {
    /// 配置错误（输入不合法）
    #[error("Configuration error: {0}")]
    Config(String),

    /// 地址解析失败
    #[error("Failed to resolve address: {0}")]
    Resolve(String),

    /// IO 错误（网络连接等）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SSH 协议错误
    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 密钥错误
    #[error("Key error: {0}")]
    Key(String),

    /// 连接超时
    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    /// 通道错误
    #[error("Channel error: {0}")]
    Channel(String),

    /// 会话已断开
    #[error("Session disconnected: {0}")]
    Disconnected(String),
}

/// 连接失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 主机不可达（解析、TCP、超时）
    Unreachable,
    /// 认证失败
    AuthFailed,
    /// 请求参数不合法
    MalformedInput,
    /// 其他协议或通道错误
    Protocol,
}

impl SshError {
    /// 对错误进行分类
    pub fn kind(&self) -> FailureKind {
        match self {
            SshError::Config(_) => FailureKind::MalformedInput,
            SshError::Resolve(_) | SshError::Io(_) | SshError::Timeout(_) => {
                FailureKind::Unreachable
            }
            SshError::Auth(_) | SshError::Key(_) => FailureKind::AuthFailed,
            SshError::Protocol(_) | SshError::Channel(_) | SshError::Disconnected(_) => {
                FailureKind::Protocol
            }
        }
    }
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        match e {
            russh::Error::IO(io) => SshError::Io(io),
            other => SshError::Protocol(other.to_string()),
        }
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(e: russh::keys::Error) -> Self {
        SshError::Key(e.to_string())
    }
}

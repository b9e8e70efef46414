// Settings 配置数据结构

use serde::{Deserialize, Serialize};

use crate::constants;

// ======================== 主配置结构 ========================

/// 应用设置（持久化用）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub connection: ConnectionSettings,
    pub sftp: SftpSettings,
}

// ======================== HTTP 服务设置 ========================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 允许的跨域来源，为空表示允许任意来源
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_LISTEN_HOST.to_string(),
            port: constants::DEFAULT_LISTEN_PORT,
            allowed_origins: vec![],
        }
    }
}

impl ServerSettings {
    /// 监听地址 host:port
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ======================== 连接设置 ========================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub default_port: u16,
    pub connection_timeout_secs: u64,
    pub keepalive_enabled: bool,
    pub keepalive_interval_secs: u64,
    pub keepalive_max: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            default_port: 22,
            connection_timeout_secs: 10,
            keepalive_enabled: true,
            keepalive_interval_secs: 60,
            keepalive_max: 3,
        }
    }
}

// ======================== SFTP 设置 ========================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpSettings {
    /// 限定可访问的远程根目录（None 表示不限制）
    pub root: Option<String>,
    /// 在线编辑的最大文件大小
    pub max_edit_bytes: u64,
    /// 单个上传文件的最大大小
    pub max_upload_bytes: u64,
    /// 目录打包下载的最大总大小
    pub max_archive_bytes: u64,
    /// 打包下载时跳过的目录名
    pub archive_skip_dirs: Vec<String>,
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            root: None,
            max_edit_bytes: constants::DEFAULT_MAX_EDIT_BYTES,
            max_upload_bytes: constants::DEFAULT_MAX_UPLOAD_BYTES,
            max_archive_bytes: constants::DEFAULT_MAX_ARCHIVE_BYTES,
            archive_skip_dirs: constants::DEFAULT_ARCHIVE_SKIP_DIRS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// HTTP 请求与响应结构

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::sftp::SortBy;
use crate::services::session::ActiveSession;
use crate::ssh::AuthMethod;

/// POST /connect
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub host: String,
    /// 0 表示默认端口
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// 私钥路径（本机），设置后使用公钥认证
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl ConnectRequest {
    /// 按请求内容选择认证方式
    pub fn auth(&self) -> AuthMethod {
        match self.key_path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => AuthMethod::PublicKey {
                key_path: PathBuf::from(path),
                passphrase: self.passphrase.clone().filter(|p| !p.is_empty()),
            },
            None => AuthMethod::Password(self.password.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub status: &'static str,
    pub session_id: String,
    pub home: String,
}

/// GET /status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl StatusResponse {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            session_id: None,
            host: None,
            port: None,
            user: None,
            home: None,
            connected_at: None,
        }
    }
}

impl From<&ActiveSession> for StatusResponse {
    fn from(session: &ActiveSession) -> Self {
        Self {
            connected: true,
            session_id: Some(session.id.clone()),
            host: Some(session.host.clone()),
            port: Some(session.port),
            user: Some(session.username.clone()),
            home: Some(session.gateway.home().to_string()),
            connected_at: Some(session.connected_at),
        }
    }
}

/// 只带 status 的响应
#[derive(Debug, Serialize)]
pub struct StatusOnly {
    pub status: &'static str,
}

/// ?path= 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

/// GET /files
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sort: SortBy,
    /// 是否显示隐藏文件，默认显示
    #[serde(default = "default_true")]
    pub hidden: bool,
}

fn default_true() -> bool {
    true
}

/// GET /downloaddir
#[derive(Debug, Default, Deserialize)]
pub struct DownloadDirQuery {
    #[serde(default)]
    pub path: String,
    /// 逗号分隔的额外跳过目录
    #[serde(default)]
    pub exclude: String,
}

impl DownloadDirQuery {
    pub fn exclude_list(&self) -> Vec<String> {
        self.exclude
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// POST /rename
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_path: String,
    pub new_path: String,
}

/// POST /mkdir
#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    pub path: String,
}

/// POST /writefile
#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct WriteFileResponse {
    pub status: &'static str,
    pub size: u64,
}

/// POST /batchdelete
#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub status: &'static str,
    pub deleted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /exists
#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// POST /upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub path: String,
    pub size: u64,
}

/// POST /exec
#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    #[serde(default)]
    pub command: String,
}

// SSH 连接配置

use std::path::PathBuf;
use std::time::Duration;

use super::error::SshError;
use crate::models::settings::ConnectionSettings;

/// SSH 连接配置
#[derive(Clone)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            auth: AuthMethod::Password(String::new()),
            connect_timeout: 10,
            keepalive: KeepaliveConfig::default(),
        }
    }
}

// 手写 Debug，避免密码进入日志
impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth", &self.auth.kind())
            .field("connect_timeout", &self.connect_timeout)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}

/// 认证方式
#[derive(Clone)]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    /// 认证方式名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Password(_) => "password",
            AuthMethod::PublicKey { .. } => "publickey",
        }
    }
}

/// 心跳配置
#[derive(Clone, Debug)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 60,
            max_retries: 3,
        }
    }
}

impl SshConfig {
    /// 按全局连接设置创建配置，端口为 0 时使用默认端口
    pub fn from_settings(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        auth: AuthMethod,
        settings: &ConnectionSettings,
    ) -> Self {
        Self {
            host: host.into().trim().to_string(),
            port: if port == 0 { settings.default_port } else { port },
            username: username.into().trim().to_string(),
            auth,
            connect_timeout: settings.connection_timeout_secs,
            keepalive: KeepaliveConfig {
                enabled: settings.keepalive_enabled,
                interval: settings.keepalive_interval_secs,
                max_retries: settings.keepalive_max,
            },
        }
    }

    /// 校验连接参数，不合法时不进行任何网络操作
    pub fn validate(&self) -> Result<(), SshError> {
        if self.host.is_empty() {
            return Err(SshError::Config("Host is required".to_string()));
        }
        if self.username.is_empty() {
            return Err(SshError::Config("User is required".to_string()));
        }
        if self.port == 0 {
            return Err(SshError::Config("Port must be between 1 and 65535".to_string()));
        }
        Ok(())
    }

    /// 目标地址 host:port
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // russh 没有单独的连接超时，TCP 与握手阶段由 client 里的 timeout 控制
        if self.keepalive.enabled {
            config.keepalive_interval = Some(Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        }
        config
    }
}

// SSH 客户端核心实现

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::Handle;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::{AuthMethod, SshConfig};
use super::error::SshError;
use super::handler::SshClientHandler;
use super::session::SshSession;

/// SSH 客户端
/// 负责建立 SSH 连接并返回 SshSession
pub struct SshClient {
    /// 连接配置
    config: SshConfig,
}

impl SshClient {
    /// 创建新的 SSH 客户端
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// 执行连接（异步）
    /// 返回 SshSession 用于后续操作
    pub async fn connect(&self, session_id: String) -> Result<SshSession, SshError> {
        self.config.validate()?;

        info!(
            "[SSH] Connecting to {}@{}:{}",
            self.config.username, self.config.host, self.config.port
        );

        let connect_timeout = Duration::from_secs(self.config.connect_timeout);

        // 解析地址
        let addr = self.config.address();
        let socket_addr = timeout(connect_timeout, tokio::net::lookup_host(addr.clone()))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(|e| SshError::Resolve(format!("{}: {}", addr, e)))?
            .next()
            .ok_or_else(|| SshError::Resolve(format!("{}: no address found", addr)))?;

        // TCP 连接
        debug!("[SSH] Opening TCP connection to {}", socket_addr);
        let tcp_stream = timeout(connect_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(SshError::Io)?;

        // SSH 握手
        debug!("[SSH] Starting SSH handshake");
        let russh_config = Arc::new(self.config.to_russh_config());
        let handler = SshClientHandler::new(self.config.host.clone());

        let mut handle = timeout(
            connect_timeout,
            russh::client::connect_stream(russh_config, tcp_stream, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
        .map_err(SshError::from)?;

        // 认证
        debug!(
            "[SSH] Authenticating as '{}' ({})",
            self.config.username,
            self.config.auth.kind()
        );
        if let Err(e) = self.authenticate(&mut handle).await {
            warn!("[SSH] Authentication failed for {}: {}", addr, e);
            let _ = handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await;
            return Err(e);
        }

        info!("[SSH] Connection established: {}", addr);

        Ok(SshSession::new(
            session_id,
            Arc::new(handle),
            self.config.address(),
        ))
    }

    /// 执行认证
    async fn authenticate(&self, handle: &mut Handle<SshClientHandler>) -> Result<(), SshError> {
        use russh::client::AuthResult;

        let (method, auth_result) = match &self.config.auth {
            AuthMethod::Password(password) => {
                let result = handle
                    .authenticate_password(&self.config.username, password)
                    .await
                    .map_err(SshError::from)?;
                ("Password", result)
            }
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                let key = self
                    .load_private_key(key_path, passphrase.as_deref())
                    .await?;

                let key_with_alg = russh::keys::PrivateKeyWithHashAlg::new(
                    Arc::new(key),
                    None, // 使用默认哈希算法
                );

                let result = handle
                    .authenticate_publickey(&self.config.username, key_with_alg)
                    .await
                    .map_err(SshError::from)?;
                ("Public key", result)
            }
        };

        match auth_result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                remaining_methods,
                partial_success,
            } => {
                if partial_success {
                    return Err(SshError::Auth(
                        "Partial authentication - additional auth required".to_string(),
                    ));
                }
                Err(SshError::Auth(format!(
                    "{} authentication failed. Server suggests: {:?}",
                    method, remaining_methods
                )))
            }
        }
    }

    /// 加载私钥文件
    async fn load_private_key(
        &self,
        key_path: &Path,
        passphrase: Option<&str>,
    ) -> Result<russh::keys::PrivateKey, SshError> {
        debug!("[SSH] Loading private key from {:?}", key_path);

        let key_data = tokio::fs::read(key_path)
            .await
            .map_err(|e| SshError::Key(format!("Failed to read key file: {}", e)))?;

        russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
            .map_err(|e| SshError::Key(format!("Failed to decode key: {}", e)))
    }
}

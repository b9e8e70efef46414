// 会话管理服务
// 同一时间只维护一个远程会话，新的连接会先关闭旧会话

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::models::settings::{ConnectionSettings, SftpSettings};
use crate::services::exec::RemoteExec;
use crate::services::sftp::{FsError, Gateway, RemoteFs, SftpService};
use crate::ssh::{AuthMethod, SshClient, SshConfig, SshError};

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ssh(#[from] SshError),

    /// SSH 已认证，但 SFTP 子系统不可用
    #[error("SFTP session failed: {0}")]
    Sftp(FsError),

    #[error("Not connected")]
    NotConnected,
}

/// 已建立的连接：文件系统与命令执行共享同一条 SSH 连接
pub struct Connection {
    pub fs: Arc<dyn RemoteFs>,
    pub exec: Arc<dyn RemoteExec>,
}

/// 建立远程连接的抽象
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, session_id: &str, config: SshConfig)
        -> Result<Connection, SessionError>;
}

/// 基于 russh / russh-sftp 的连接器
#[derive(Debug, Default, Clone, Copy)]
pub struct RusshConnector;

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(
        &self,
        session_id: &str,
        config: SshConfig,
    ) -> Result<Connection, SessionError> {
        let session = Arc::new(SshClient::new(config).connect(session_id.to_string()).await?);

        match SftpService::new(session_id.to_string(), &session).await {
            Ok(sftp) => Ok(Connection {
                fs: Arc::new(sftp),
                exec: session,
            }),
            Err(e) => {
                error!("[Session] SFTP setup failed for {}: {}", session_id, e);
                if let Err(close_err) = session.close().await {
                    warn!("[Session] Failed to close SSH session: {}", close_err);
                }
                Err(SessionError::Sftp(e))
            }
        }
    }
}

/// 当前活跃的远程会话
pub struct ActiveSession {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connected_at: DateTime<Utc>,
    pub gateway: Gateway,
    pub exec: Arc<dyn RemoteExec>,
}

impl ActiveSession {
    /// 关闭 SFTP 通道并断开 SSH
    async fn close(&self) {
        self.gateway.close().await;
        if let Err(e) = self.exec.close().await {
            warn!("[Session] Failed to disconnect {}: {}", self.id, e);
        }
        info!("[Session] Session {} closed", self.id);
    }
}

/// 会话管理器
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    connection_settings: ConnectionSettings,
    sftp_settings: SftpSettings,
    current: Mutex<Option<Arc<ActiveSession>>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        connection_settings: ConnectionSettings,
        sftp_settings: SftpSettings,
    ) -> Self {
        Self {
            connector,
            connection_settings,
            sftp_settings,
            current: Mutex::new(None),
        }
    }

    /// 建立新会话，替换已有会话
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
    ) -> Result<Arc<ActiveSession>, SessionError> {
        let config =
            SshConfig::from_settings(host, port, username, auth, &self.connection_settings);
        config.validate()?;

        // 整个连接过程持有锁，并发的 connect 依次进行
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            info!("[Session] Replacing session {}", previous.id);
            previous.close().await;
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        info!(
            "[Session] Connecting {} to {}@{}:{} ({})",
            session_id,
            config.username,
            config.host,
            config.port,
            config.auth.kind()
        );

        let (host, port, username) = (config.host.clone(), config.port, config.username.clone());
        let connection = self.connector.connect(&session_id, config).await?;

        let gateway = match Gateway::open(connection.fs.clone(), &self.sftp_settings).await {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("[Session] Failed to resolve home directory: {}", e);
                connection.fs.close().await;
                if let Err(close_err) = connection.exec.close().await {
                    warn!("[Session] Failed to disconnect: {}", close_err);
                }
                return Err(SessionError::Sftp(e));
            }
        };

        let session = Arc::new(ActiveSession {
            id: session_id,
            host,
            port,
            username,
            connected_at: Utc::now(),
            gateway,
            exec: connection.exec,
        });
        info!(
            "[Session] Session {} connected, home={}",
            session.id,
            session.gateway.home()
        );

        *current = Some(session.clone());
        Ok(session)
    }

    /// 断开当前会话，没有会话时也视为成功
    pub async fn disconnect(&self) {
        let previous = self.current.lock().await.take();
        match previous {
            Some(session) => session.close().await,
            None => info!("[Session] Disconnect requested with no active session"),
        }
    }

    /// 获取当前会话
    pub async fn current(&self) -> Result<Arc<ActiveSession>, SessionError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotConnected)
    }

    /// 当前会话（可能为空）
    pub async fn status(&self) -> Option<Arc<ActiveSession>> {
        self.current.lock().await.clone()
    }
}

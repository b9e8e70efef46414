// SFTP 服务 - 封装 russh-sftp 客户端

use std::sync::Arc;

use async_trait::async_trait;
use russh_sftp::client::fs::Metadata;
use russh_sftp::client::SftpSession;
use tracing::{debug, info, warn};

use super::error::FsError;
use super::fs::{RemoteFs, RemoteReader, RemoteWriter};
use super::path::file_name;
use crate::models::sftp::{FileEntry, FileType};
use crate::ssh::session::SshSession;

/// SFTP 服务
/// 封装 russh-sftp 客户端，提供文件操作接口
pub struct SftpService {
    /// 会话 ID
    session_id: String,
    /// russh-sftp 客户端会话（线程安全）
    sftp: Arc<SftpSession>,
}

impl SftpService {
    /// 创建 SFTP 服务
    pub async fn new(session_id: String, ssh_session: &SshSession) -> Result<Self, FsError> {
        info!("[SFTP] Creating SFTP service for session {}", session_id);

        // 打开 SFTP 子系统通道
        let channel = ssh_session
            .handle()
            .channel_open_session()
            .await
            .map_err(|e| FsError::ConnectionLost(format!("Failed to open channel: {}", e)))?;

        // 请求 SFTP 子系统
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| {
                FsError::ConnectionLost(format!("Failed to request sftp subsystem: {}", e))
            })?;

        // 使用 russh-sftp 包装通道
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| FsError::ConnectionLost(format!("Failed to create SFTP session: {}", e)))?;

        info!("[SFTP] SFTP service created for session {}", session_id);

        Ok(Self {
            session_id,
            sftp: Arc::new(sftp),
        })
    }
}

/// 将 SFTP 属性转换为文件条目
fn entry_from_metadata(name: String, attrs: &Metadata) -> FileEntry {
    // 确定文件类型
    let file_type = if attrs.is_dir() {
        FileType::Directory
    } else if attrs.is_symlink() {
        FileType::Symlink
    } else {
        // russh-sftp 没有 is_file()，默认为普通文件
        FileType::File
    };

    FileEntry::new(name, file_type)
        .with_size(attrs.size.unwrap_or(0))
        .with_mtime(attrs.mtime.map(u64::from))
        .with_permissions(attrs.permissions.map(|p| p as u32))
}

#[async_trait]
impl RemoteFs for SftpService {
    async fn canonicalize(&self, path: &str) -> Result<String, FsError> {
        self.sftp
            .canonicalize(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))
    }

    async fn stat(&self, path: &str) -> Result<FileEntry, FsError> {
        debug!("[SFTP] Getting stat for: {}", path);
        let attrs = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))?;
        Ok(entry_from_metadata(file_name(path).to_string(), &attrs))
    }

    async fn lstat(&self, path: &str) -> Result<FileEntry, FsError> {
        let attrs = self
            .sftp
            .symlink_metadata(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))?;
        Ok(entry_from_metadata(file_name(path).to_string(), &attrs))
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>, FsError> {
        debug!("[SFTP] Reading directory: {}", path);

        let dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))?;

        let entries: Vec<FileEntry> = dir
            .filter_map(|entry| {
                let name = entry.file_name();
                // 跳过 . 和 ..
                if name == "." || name == ".." {
                    return None;
                }
                Some(entry_from_metadata(name, &entry.metadata()))
            })
            .collect();

        debug!("[SFTP] Read {} entries from {}", entries.len(), path);
        Ok(entries)
    }

    async fn create_dir(&self, path: &str) -> Result<(), FsError> {
        info!("[SFTP] Creating directory: {}", path);
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        info!("[SFTP] Removing file: {}", path);
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))
    }

    async fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        info!("[SFTP] Removing directory: {}", path);
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        info!("[SFTP] Renaming {} -> {}", from, to);
        self.sftp
            .rename(from, to)
            .await
            .map_err(|e| FsError::from_sftp(e, from))
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader, FsError> {
        debug!("[SFTP] Opening for read: {}", path);
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))?;
        Ok(Box::new(file))
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter, FsError> {
        debug!("[SFTP] Creating file: {}", path);
        let file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| FsError::from_sftp(e, path))?;
        Ok(Box::new(file))
    }

    async fn close(&self) {
        if let Err(e) = self.sftp.close().await {
            warn!(
                "[SFTP] Failed to close SFTP session {}: {}",
                self.session_id, e
            );
        }
    }
}

impl Drop for SftpService {
    fn drop(&mut self) {
        info!(
            "[SFTP] Dropping SFTP service for session {}",
            self.session_id
        );
    }
}

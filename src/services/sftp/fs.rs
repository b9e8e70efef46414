// 远程文件系统抽象
// SftpService 是唯一的生产实现，网关逻辑只依赖这个 trait

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::FsError;
use crate::models::sftp::FileEntry;

/// 远程文件读取流
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;
/// 远程文件写入流
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// 远程文件系统基础操作（与 SFTP 请求一一对应）
///
/// 所有路径都是已经解析过的绝对路径。
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// 规范化路径（realpath）
    async fn canonicalize(&self, path: &str) -> Result<String, FsError>;

    /// 获取属性（跟随符号链接）
    async fn stat(&self, path: &str) -> Result<FileEntry, FsError>;

    /// 获取属性（不跟随符号链接）
    async fn lstat(&self, path: &str) -> Result<FileEntry, FsError>;

    /// 读取目录（不包含 . 和 ..）
    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>, FsError>;

    /// 创建单级目录
    async fn create_dir(&self, path: &str) -> Result<(), FsError>;

    /// 删除文件
    async fn remove_file(&self, path: &str) -> Result<(), FsError>;

    /// 删除空目录
    async fn remove_dir(&self, path: &str) -> Result<(), FsError>;

    /// 重命名
    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// 打开文件读取
    async fn open_read(&self, path: &str) -> Result<RemoteReader, FsError>;

    /// 创建或截断文件并打开写入
    async fn create(&self, path: &str) -> Result<RemoteWriter, FsError>;

    /// 关闭底层通道
    async fn close(&self) {}
}

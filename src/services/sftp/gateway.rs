// 远程文件网关
// 在 RemoteFs 之上做路径解析、作用域检查和错误分类

use std::collections::HashSet;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::archive;
use super::error::FsError;
use super::fs::{RemoteFs, RemoteReader, RemoteWriter};
use super::path::{
    file_name, get_parent_path, join_path, normalize_relative, sanitize_file_name, PathScope,
};
use crate::models::settings::SftpSettings;
use crate::models::sftp::{sort_entries, FileContent, FileEntry, SortBy};

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// 文件名（最后一段）
    pub filename: String,
    /// 远程完整路径
    pub path: String,
    /// 写入字节数
    pub size: u64,
}

/// 下载流
pub struct Download {
    pub file_name: String,
    pub size: u64,
    pub reader: RemoteReader,
}

/// 打包后的目录
pub struct DirArchive {
    /// 形如 "project.zip"
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 批量删除结果：遇到第一个失败即停止
#[derive(Debug)]
pub struct BatchDeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Option<(String, FsError)>,
}

/// 文件网关
pub struct Gateway {
    fs: Arc<dyn RemoteFs>,
    scope: PathScope,
    settings: SftpSettings,
}

impl Gateway {
    /// 解析 home 目录并创建网关
    pub async fn open(fs: Arc<dyn RemoteFs>, settings: &SftpSettings) -> Result<Self, FsError> {
        let home = fs.canonicalize(".").await?;
        let mut scope = PathScope::new(&home, settings.root.as_deref());
        if let Some(root) = scope.root().map(str::to_string) {
            match fs.canonicalize(&root).await {
                Ok(real) => scope = scope.with_real_root(real),
                Err(e) => warn!("[SFTP] Cannot resolve root {}: {}", root, e),
            }
        }
        info!(
            "[SFTP] Gateway ready, home={}, root={:?}",
            scope.home(),
            scope.root()
        );
        Ok(Self {
            fs,
            scope,
            settings: settings.clone(),
        })
    }

    /// 会话的 home 目录
    pub fn home(&self) -> &str {
        self.scope.home()
    }

    /// 关闭底层 SFTP 通道
    pub async fn close(&self) {
        self.fs.close().await;
    }

    /// 列出目录
    pub async fn list(
        &self,
        path: &str,
        sort_by: SortBy,
        show_hidden: bool,
    ) -> Result<Vec<FileEntry>, FsError> {
        let dir = self.scope.resolve(path)?;
        self.confine(&dir).await?;
        let meta = self.fs.stat(&dir).await?;
        if !meta.is_dir {
            return Err(FsError::NotADirectory(dir));
        }

        let mut entries = self.fs.read_dir(&dir).await?;
        if !show_hidden {
            entries.retain(|e| !e.is_hidden());
        }
        sort_entries(&mut entries, sort_by);
        Ok(entries)
    }

    /// 读取文本文件
    pub async fn read(&self, path: &str) -> Result<FileContent, FsError> {
        let file = self.scope.resolve(path)?;
        self.confine(&file).await?;
        let meta = self.fs.stat(&file).await?;
        if meta.is_dir {
            return Err(FsError::IsADirectory(file));
        }
        let limit = self.settings.max_edit_bytes;
        if meta.size > limit {
            return Err(FsError::TooLarge {
                size: meta.size,
                limit,
            });
        }

        let reader = self.fs.open_read(&file).await?;
        let mut buf = Vec::with_capacity(meta.size as usize);
        // 文件可能在 stat 之后变大
        reader
            .take(limit + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| FsError::from_io(e, &file))?;
        if buf.len() as u64 > limit {
            return Err(FsError::TooLarge {
                size: buf.len() as u64,
                limit,
            });
        }

        Ok(FileContent {
            size: buf.len() as u64,
            content: String::from_utf8_lossy(&buf).into_owned(),
        })
    }

    /// 写入文本文件（创建或截断），返回写入字节数
    pub async fn write(&self, path: &str, content: &str) -> Result<u64, FsError> {
        let file = self.scope.resolve(path)?;
        if file == "/" {
            return Err(FsError::InvalidPath(file));
        }
        self.confine(&file).await?;
        match self.fs.stat(&file).await {
            Ok(meta) if meta.is_dir => return Err(FsError::IsADirectory(file)),
            Ok(_) | Err(FsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.ensure_parent(&file).await?;

        let mut writer = self.fs.create(&file).await?;
        writer
            .write_all(content.as_bytes())
            .await
            .map_err(|e| FsError::from_io(e, &file))?;
        writer
            .shutdown()
            .await
            .map_err(|e| FsError::from_io(e, &file))?;

        info!("[SFTP] Saved {} ({} bytes)", file, content.len());
        Ok(content.len() as u64)
    }

    /// 重命名，目标已存在时拒绝
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = self.scope.resolve(from)?;
        let to = self.scope.resolve(to)?;
        self.confine_parent(&from).await?;
        self.confine_parent(&to).await?;

        self.fs.lstat(&from).await?;
        match self.fs.lstat(&to).await {
            Ok(_) => return Err(FsError::TargetExists(to)),
            Err(FsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.ensure_parent(&to).await?;

        self.fs.rename(&from, &to).await
    }

    /// 删除文件或目录（目录递归删除，不跟随符号链接）
    pub async fn delete(&self, path: &str) -> Result<(), FsError> {
        let target = self.scope.resolve(path)?;
        if target == "/" || target == self.scope.home() || Some(target.as_str()) == self.scope.root()
        {
            return Err(FsError::InvalidPath(format!("refusing to delete {}", target)));
        }
        self.confine_parent(&target).await?;

        let meta = self.fs.lstat(&target).await?;
        if meta.is_dir {
            self.remove_tree(&target).await
        } else {
            self.fs.remove_file(&target).await
        }
    }

    /// 依次删除多个路径，遇到失败立即停止（不回滚）
    pub async fn delete_many(&self, paths: &[String]) -> BatchDeleteOutcome {
        let mut deleted = Vec::with_capacity(paths.len());
        for path in paths {
            if let Err(e) = self.delete(path).await {
                warn!("[SFTP] Batch delete stopped at {}: {}", path, e);
                return BatchDeleteOutcome {
                    deleted,
                    failed: Some((path.clone(), e)),
                };
            }
            deleted.push(path.clone());
        }
        BatchDeleteOutcome {
            deleted,
            failed: None,
        }
    }

    /// 创建目录
    pub async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let dir = self.scope.resolve(path)?;
        self.confine_parent(&dir).await?;
        match self.fs.lstat(&dir).await {
            Ok(_) => return Err(FsError::AlreadyExists(dir)),
            Err(FsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.ensure_parent(&dir).await?;
        self.fs.create_dir(&dir).await
    }

    /// 路径是否存在
    pub async fn exists(&self, path: &str) -> Result<bool, FsError> {
        let target = self.scope.resolve(path)?;
        self.confine_parent(&target).await?;
        match self.fs.lstat(&target).await {
            Ok(_) => Ok(true),
            Err(FsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 上传文件到目录
    /// subpath 存在时（文件夹上传）文件落在 dir/subpath，并逐级创建中间目录
    pub async fn upload<R>(
        &self,
        dir: &str,
        original_name: &str,
        subpath: Option<&str>,
        data: R,
    ) -> Result<UploadOutcome, FsError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let dir = self.scope.resolve(dir)?;
        self.confine(&dir).await?;
        let meta = self.fs.stat(&dir).await?;
        if !meta.is_dir {
            return Err(FsError::NotADirectory(dir));
        }

        let (filename, relative) = match subpath.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sub) => {
                let relative = normalize_relative(sub)?;
                (file_name(&relative).to_string(), relative)
            }
            None => {
                let name = sanitize_file_name(original_name)?;
                (name.clone(), name)
            }
        };
        let target = join_path(&dir, &relative);
        if !self.scope.contains(&target) {
            return Err(FsError::OutsideRoot(target));
        }
        self.confine(&target).await?;
        self.create_intermediate_dirs(&dir, &relative).await?;

        let existed = match self.fs.lstat(&target).await {
            Ok(_) => true,
            Err(FsError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        info!("[SFTP] Uploading {}", target);
        let writer = self.fs.create(&target).await?;
        match self.copy_into(&target, writer, data).await {
            Ok(size) => {
                info!("[SFTP] Uploaded {} ({} bytes)", target, size);
                Ok(UploadOutcome {
                    filename,
                    path: target,
                    size,
                })
            }
            Err(e) => {
                warn!("[SFTP] Upload of {} failed: {}", target, e);
                // 只清理本次新建的文件，已有文件保留（内容已被截断）
                if existed {
                    warn!("[SFTP] Existing file {} left truncated", target);
                } else if let Err(cleanup) = self.fs.remove_file(&target).await {
                    debug!("[SFTP] Partial file not removed: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    /// 打开文件下载流
    pub async fn download(&self, path: &str) -> Result<Download, FsError> {
        let file = self.scope.resolve(path)?;
        self.confine(&file).await?;
        let meta = self.fs.stat(&file).await?;
        if meta.is_dir {
            return Err(FsError::IsADirectory(file));
        }
        let reader = self.fs.open_read(&file).await?;
        Ok(Download {
            file_name: file_name(&file).to_string(),
            size: meta.size,
            reader,
        })
    }

    /// 将目录打包为 zip
    /// extra_skip 为额外跳过的目录名
    pub async fn download_dir(
        &self,
        path: &str,
        extra_skip: &[String],
    ) -> Result<DirArchive, FsError> {
        let dir = self.scope.resolve(path)?;
        self.confine(&dir).await?;
        let meta = self.fs.stat(&dir).await?;
        if !meta.is_dir {
            return Err(FsError::NotADirectory(dir));
        }

        let skip: HashSet<String> = self
            .settings
            .archive_skip_dirs
            .iter()
            .chain(extra_skip.iter())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = match file_name(&dir) {
            "/" => "root".to_string(),
            name => name.to_string(),
        };

        let items = archive::collect(
            self.fs.as_ref(),
            &dir,
            &base,
            &skip,
            self.settings.max_archive_bytes,
        )
        .await?;
        info!("[SFTP] Archiving {} ({} entries)", dir, items.len());

        let bytes = tokio::task::spawn_blocking(move || archive::build_zip(&items))
            .await
            .map_err(|e| FsError::Other(format!("archive task failed: {}", e)))??;

        Ok(DirArchive {
            file_name: format!("{}.zip", base),
            bytes,
        })
    }

    /// 有根目录限制时，服务端 realpath 也必须落在根目录内
    /// 路径不存在时检查最近的已存在上级目录
    async fn confine(&self, path: &str) -> Result<(), FsError> {
        if self.scope.root().is_none() {
            return Ok(());
        }
        let mut current = path.to_string();
        loop {
            match self.fs.canonicalize(&current).await {
                Ok(real) if self.scope.contains_real(&real) => return Ok(()),
                Ok(real) => {
                    warn!("[SFTP] {} resolves to {} outside root", path, real);
                    return Err(FsError::OutsideRoot(path.to_string()));
                }
                Err(FsError::NotFound(_)) if current != "/" => {
                    // 解析不了但 lstat 存在：悬空的符号链接
                    match self.fs.lstat(&current).await {
                        Ok(_) => {
                            warn!("[SFTP] {} is a dangling link", current);
                            return Err(FsError::OutsideRoot(path.to_string()));
                        }
                        Err(FsError::NotFound(_)) => current = get_parent_path(&current),
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 不跟随最后一段的操作只检查父目录
    async fn confine_parent(&self, path: &str) -> Result<(), FsError> {
        self.confine(&get_parent_path(path)).await
    }

    /// 父目录必须存在且是目录
    async fn ensure_parent(&self, path: &str) -> Result<(), FsError> {
        let parent = get_parent_path(path);
        match self.fs.stat(&parent).await {
            Ok(meta) if meta.is_dir => Ok(()),
            Ok(_) => Err(FsError::NotADirectory(parent)),
            Err(FsError::NotFound(_)) => Err(FsError::ParentMissing(parent)),
            Err(e) => Err(e),
        }
    }

    /// 逐级创建 dir 下 relative 的父目录，已存在的目录跳过
    async fn create_intermediate_dirs(&self, dir: &str, relative: &str) -> Result<(), FsError> {
        let mut current = dir.to_string();
        let parts: Vec<&str> = relative.split('/').collect();
        for part in &parts[..parts.len().saturating_sub(1)] {
            current = join_path(&current, part);
            match self.fs.stat(&current).await {
                Ok(meta) if meta.is_dir => continue,
                Ok(_) => return Err(FsError::NotADirectory(current)),
                Err(FsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            debug!("[SFTP] Creating directory for upload: {}", current);
            self.fs.create_dir(&current).await?;
        }
        Ok(())
    }

    /// 写入远程文件，超过上传上限即失败
    async fn copy_into<R>(
        &self,
        target: &str,
        mut writer: RemoteWriter,
        data: R,
    ) -> Result<u64, FsError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let limit = self.settings.max_upload_bytes;
        let mut limited = data.take(limit + 1);
        let written = tokio::io::copy(&mut limited, &mut writer)
            .await
            .map_err(|e| FsError::from_io(e, target))?;
        if written > limit {
            return Err(FsError::TooLarge {
                size: written,
                limit,
            });
        }
        writer
            .shutdown()
            .await
            .map_err(|e| FsError::from_io(e, target))?;
        Ok(written)
    }

    /// 递归删除目录：先收集，再从最深处开始删
    async fn remove_tree(&self, root: &str) -> Result<(), FsError> {
        let mut pending = vec![root.to_string()];
        let mut dirs = Vec::new();

        while let Some(dir) = pending.pop() {
            for entry in self.fs.read_dir(&dir).await? {
                let child = join_path(&dir, &entry.name);
                // 目录内的符号链接只删链接本身
                if entry.is_dir && !entry.is_symlink {
                    pending.push(child);
                } else {
                    self.fs.remove_file(&child).await?;
                }
            }
            dirs.push(dir);
        }

        // 父目录先于子目录被发现，倒序即可先删子目录
        for dir in dirs.iter().rev() {
            self.fs.remove_dir(dir).await?;
        }
        info!("[SFTP] Removed directory tree {}", root);
        Ok(())
    }
}

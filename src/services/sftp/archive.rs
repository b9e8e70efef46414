// 目录打包
// 先异步读取远程目录树，再在阻塞线程里写 zip

use std::collections::HashSet;
use std::io::{Cursor, Write};

use tokio::io::AsyncReadExt;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::FsError;
use super::fs::RemoteFs;
use super::path::join_path;

/// zip 中的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveItem {
    /// 目录，名称不带结尾的 /
    Dir(String),
    /// 文件及其内容
    File {
        name: String,
        data: Vec<u8>,
        permissions: Option<u32>,
    },
}

/// 遍历远程目录，收集要打包的条目
///
/// 条目名以 `prefix/` 开头；名称在 `skip` 中的子目录整个跳过；
/// 符号链接不打包；文件总大小超过 `limit` 时返回 TooLarge。
pub async fn collect(
    fs: &dyn RemoteFs,
    root: &str,
    prefix: &str,
    skip: &HashSet<String>,
    limit: u64,
) -> Result<Vec<ArchiveItem>, FsError> {
    let mut items = Vec::new();
    let mut total: u64 = 0;
    let mut pending = vec![(root.to_string(), prefix.to_string())];

    while let Some((dir, zip_dir)) = pending.pop() {
        let mut entries = fs.read_dir(&dir).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        items.push(ArchiveItem::Dir(zip_dir.clone()));

        let mut subdirs = Vec::new();
        for entry in entries {
            let remote = join_path(&dir, &entry.name);
            let zip_name = format!("{}/{}", zip_dir, entry.name);

            if entry.is_symlink {
                debug!("[SFTP] Archive skips symlink {}", remote);
                continue;
            }
            if entry.is_dir {
                if skip.contains(&entry.name) {
                    debug!("[SFTP] Archive skips directory {}", remote);
                    continue;
                }
                subdirs.push((remote, zip_name));
                continue;
            }

            total = total.saturating_add(entry.size);
            if total > limit {
                return Err(FsError::TooLarge { size: total, limit });
            }

            let mut data = Vec::with_capacity(entry.size as usize);
            fs.open_read(&remote)
                .await?
                .read_to_end(&mut data)
                .await
                .map_err(|e| FsError::from_io(e, &remote))?;
            items.push(ArchiveItem::File {
                name: zip_name,
                data,
                permissions: entry.permissions,
            });
        }

        // 倒序入栈，保持按名称的遍历顺序
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(items)
}

/// 将条目写成 zip（Deflate 压缩）
pub fn build_zip(items: &[ArchiveItem]) -> Result<Vec<u8>, FsError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for item in items {
        match item {
            ArchiveItem::Dir(name) => {
                writer
                    .add_directory(format!("{}/", name), deflated())
                    .map_err(zip_error)?;
            }
            ArchiveItem::File {
                name,
                data,
                permissions,
            } => {
                let file_options = match permissions {
                    Some(mode) => deflated().unix_permissions(*mode),
                    None => deflated(),
                };
                writer
                    .start_file(name.as_str(), file_options)
                    .map_err(zip_error)?;
                writer
                    .write_all(data)
                    .map_err(|e| FsError::Other(format!("zip write failed: {}", e)))?;
            }
        }
    }

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn zip_error(e: zip::result::ZipError) -> FsError {
    FsError::Other(format!("zip failed: {}", e))
}

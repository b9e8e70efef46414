// SFTP 基础数据类型

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// 普通文件
    #[default]
    File,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
}

/// 文件条目
/// 序列化为前端使用的 {name, isDir, size, modTime} 结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// 文件名
    pub name: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 是否目录
    pub is_dir: bool,
    /// 是否符号链接
    pub is_symlink: bool,
    /// 修改时间（RFC 3339，未知时为空字符串）
    pub mod_time: String,
    /// Unix 权限（如 0o755）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<u32>,
    /// 修改时间戳（秒），用于排序
    #[serde(skip)]
    pub mtime: Option<u64>,
}

impl FileEntry {
    /// 创建新的文件条目
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_dir: file_type == FileType::Directory,
            is_symlink: file_type == FileType::Symlink,
            mod_time: String::new(),
            permissions: None,
            mtime: None,
        }
    }

    /// 设置大小
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// 设置修改时间（Unix 秒）
    pub fn with_mtime(mut self, mtime: Option<u64>) -> Self {
        self.mtime = mtime;
        self.mod_time = mtime.map(format_mtime).unwrap_or_default();
        self
    }

    /// 设置权限位
    pub fn with_permissions(mut self, permissions: Option<u32>) -> Self {
        self.permissions = permissions.map(|p| p & 0o7777);
        self
    }

    /// 是否是隐藏文件（以 . 开头）
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Unix 秒格式化为 RFC 3339（UTC）
pub fn format_mtime(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// 按名称（不区分大小写）
    #[default]
    Name,
    /// 按大小（大的在前）
    Size,
    /// 按修改时间（新的在前）
    Date,
}

/// 排序：目录始终在文件之前
pub fn sort_entries(entries: &mut [FileEntry], sort_by: SortBy) {
    entries.sort_by(|a, b| {
        b.is_dir.cmp(&a.is_dir).then_with(|| match sort_by {
            SortBy::Name => compare_names(a, b),
            SortBy::Size => b.size.cmp(&a.size).then_with(|| compare_names(a, b)),
            SortBy::Date => b.mtime.cmp(&a.mtime).then_with(|| compare_names(a, b)),
        })
    });
}

fn compare_names(a: &FileEntry, b: &FileEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

/// 读取到的文本文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub content: String,
    pub size: u64,
}

// 远程路径解析
// 所有请求路径先在这里变成规范化的绝对路径，再交给 RemoteFs

use super::error::FsError;

/// 获取父目录路径
pub fn get_parent_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => path[..pos].to_string(),
        None => "/".to_string(),
    }
}

/// 连接路径
pub fn join_path(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{}", name.trim_start_matches('/'))
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }
}

/// 获取路径的最后一段
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("/")
}

/// 词法规范化绝对路径：去掉重复的 /、. 和 ..（不访问远程）
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// 规范化相对子路径（文件夹上传的 subpath），不允许跳出起点
pub fn normalize_relative(path: &str) -> Result<String, FsError> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FsError::InvalidPath(path.to_string()));
                }
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

/// 上传文件名只保留最后一段
pub fn sanitize_file_name(name: &str) -> Result<String, FsError> {
    let unified = name.replace('\\', "/");
    let base = unified.rsplit('/').next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(FsError::InvalidPath(name.to_string()));
    }
    Ok(base.to_string())
}

fn is_within(path: &str, root: &str) -> bool {
    path == root || path.starts_with(&format!("{}/", root))
}

/// 会话的路径作用域：home 目录与可选的根目录限制
#[derive(Debug, Clone)]
pub struct PathScope {
    home: String,
    root: Option<String>,
    /// 根目录在服务端 realpath 后的位置
    real_root: Option<String>,
}

impl PathScope {
    /// 创建作用域，相对的 root 以 home 为基准
    pub fn new(home: &str, root: Option<&str>) -> Self {
        let home = normalize_path(home);
        let root = root
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| {
                if r.starts_with('/') {
                    normalize_path(r)
                } else {
                    normalize_path(&join_path(&home, r))
                }
            })
            .filter(|r| r != "/");
        // home 不在根目录内时，以根目录作为起点
        let home = match &root {
            Some(r) if !is_within(&home, r) => r.clone(),
            _ => home,
        };
        Self {
            home,
            real_root: root.clone(),
            root,
        }
    }

    /// 记录根目录的 realpath（根目录本身可能是符号链接）
    pub fn with_real_root(mut self, real_root: String) -> Self {
        if self.root.is_some() {
            self.real_root = Some(real_root);
        }
        self
    }

    /// 用户主目录
    pub fn home(&self) -> &str {
        &self.home
    }

    /// 根目录限制
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// 路径是否在允许范围内
    pub fn contains(&self, path: &str) -> bool {
        match &self.root {
            None => true,
            Some(root) => is_within(path, root),
        }
    }

    /// realpath 后的路径是否仍在根目录内
    pub fn contains_real(&self, real_path: &str) -> bool {
        match &self.real_root {
            None => true,
            Some(root) => is_within(real_path, root),
        }
    }

    /// 解析请求路径
    /// 空字符串和 "." 表示 home，相对路径基于 home，~ 展开为 home
    pub fn resolve(&self, raw: &str) -> Result<String, FsError> {
        if raw.contains('\0') {
            return Err(FsError::InvalidPath(raw.escape_default().to_string()));
        }

        let resolved = if raw.is_empty() || raw == "." || raw == "~" {
            self.home.clone()
        } else if let Some(rest) = raw.strip_prefix("~/") {
            normalize_path(&join_path(&self.home, rest))
        } else if raw.starts_with('/') {
            normalize_path(raw)
        } else {
            normalize_path(&join_path(&self.home, raw))
        };

        if !self.contains(&resolved) {
            return Err(FsError::OutsideRoot(raw.to_string()));
        }
        Ok(resolved)
    }
}

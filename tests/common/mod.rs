// 集成测试用的内存远程主机
// MemoryFs 模拟 SFTP 服务端，FakeExec 模拟 shell，FakeConnector 模拟连接

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use vpsmaster::models::settings::AppSettings;
use vpsmaster::services::exec::RemoteExec;
use vpsmaster::services::session::{Connection, Connector, SessionError, SessionManager};
use vpsmaster::services::sftp::path::{get_parent_path, join_path, normalize_path};
use vpsmaster::services::sftp::{FsError, RemoteFs, RemoteReader, RemoteWriter};
use vpsmaster::ssh::{AuthMethod, CommandOutput, SshConfig, SshError};
use vpsmaster::models::sftp::{FileEntry, FileType};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Symlink(String),
}

type Nodes = Arc<Mutex<BTreeMap<String, Node>>>;

/// 以绝对路径为键的内存目录树
/// 与真实服务端一样，stat/open/create/read_dir 会跟随符号链接
pub struct MemoryFs {
    home: String,
    nodes: Nodes,
    denied: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl MemoryFs {
    pub fn new(home: &str) -> Self {
        let fs = Self {
            home: home.to_string(),
            nodes: Arc::new(Mutex::new(BTreeMap::new())),
            denied: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        };
        fs.add_dir(home);
        fs
    }

    /// 创建目录及其所有上级目录
    pub fn add_dir(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let mut current = String::new();
        nodes.insert("/".to_string(), Node::Dir);
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = format!("{}/{}", current, part);
            nodes.entry(current.clone()).or_insert(Node::Dir);
        }
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.add_dir(&get_parent_path(path));
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::File(content.to_vec()));
    }

    pub fn add_symlink(&self, path: &str, target: &str) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::Symlink(target.to_string()));
    }

    /// 之后访问该路径的请求都返回权限错误
    pub fn deny(&self, path: &str) {
        self.denied.lock().unwrap().insert(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.lock().unwrap().contains_key(path)
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self, path: &str) -> Result<(), FsError> {
        if self.denied.lock().unwrap().contains(path) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn entry(name: &str, node: &Node) -> FileEntry {
        match node {
            Node::Dir => FileEntry::new(name, FileType::Directory).with_size(4096),
            Node::File(data) => FileEntry::new(name, FileType::File)
                .with_size(data.len() as u64)
                .with_mtime(Some(1_700_000_000))
                .with_permissions(Some(0o644)),
            Node::Symlink(_) => FileEntry::new(name, FileType::Symlink),
        }
    }

    fn base(path: &str) -> String {
        vpsmaster::services::sftp::path::file_name(path).to_string()
    }

    fn is_child(parent: &str, candidate: &str) -> bool {
        candidate != parent && get_parent_path(candidate) == parent
    }

    /// 逐段解析符号链接，follow_last 为 false 时保留最后一段链接本身
    fn resolve(nodes: &BTreeMap<String, Node>, path: &str, follow_last: bool) -> String {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut current = "/".to_string();
        for (i, part) in parts.iter().enumerate() {
            let last = i + 1 == parts.len();
            let mut next = join_path(&current, part);
            let mut hops = 0;
            while let Some(Node::Symlink(target)) = nodes.get(&next) {
                if (last && !follow_last) || hops > 8 {
                    break;
                }
                next = if target.starts_with('/') {
                    normalize_path(target)
                } else {
                    normalize_path(&join_path(&current, target))
                };
                hops += 1;
            }
            current = next;
        }
        current
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn canonicalize(&self, path: &str) -> Result<String, FsError> {
        let nodes = self.nodes.lock().unwrap();
        let resolved = if path == "." {
            self.home.clone()
        } else {
            Self::resolve(&nodes, path, true)
        };
        if !nodes.contains_key(&resolved) {
            return Err(FsError::NotFound(path.to_string()));
        }
        Ok(resolved)
    }

    async fn stat(&self, path: &str) -> Result<FileEntry, FsError> {
        self.check(path)?;
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&Self::resolve(&nodes, path, true)) {
            Some(Node::Symlink(_)) | None => Err(FsError::NotFound(path.to_string())),
            Some(node) => Ok(Self::entry(&Self::base(path), node)),
        }
    }

    async fn lstat(&self, path: &str) -> Result<FileEntry, FsError> {
        self.check(path)?;
        let nodes = self.nodes.lock().unwrap();
        nodes
            .get(&Self::resolve(&nodes, path, false))
            .map(|node| Self::entry(&Self::base(path), node))
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>, FsError> {
        self.check(path)?;
        let nodes = self.nodes.lock().unwrap();
        let real = Self::resolve(&nodes, path, true);
        match nodes.get(&real) {
            Some(Node::Dir) => {}
            Some(_) => return Err(FsError::Other(format!("{}: Failure", path))),
            None => return Err(FsError::NotFound(path.to_string())),
        }
        Ok(nodes
            .iter()
            .filter(|(candidate, _)| Self::is_child(&real, candidate))
            .map(|(candidate, node)| Self::entry(&Self::base(candidate), node))
            .collect())
    }

    async fn create_dir(&self, path: &str) -> Result<(), FsError> {
        self.check(path)?;
        let mut nodes = self.nodes.lock().unwrap();
        let real = Self::resolve(&nodes, path, false);
        if nodes.contains_key(&real) {
            return Err(FsError::Other(format!("{}: Failure", path)));
        }
        match nodes.get(&get_parent_path(&real)) {
            Some(Node::Dir) => {}
            _ => return Err(FsError::NotFound(path.to_string())),
        }
        nodes.insert(real, Node::Dir);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        self.check(path)?;
        let mut nodes = self.nodes.lock().unwrap();
        let real = Self::resolve(&nodes, path, false);
        match nodes.get(&real) {
            Some(Node::Dir) => Err(FsError::Other(format!("{}: Failure", path))),
            Some(_) => {
                nodes.remove(&real);
                Ok(())
            }
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    async fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        self.check(path)?;
        let mut nodes = self.nodes.lock().unwrap();
        let real = Self::resolve(&nodes, path, false);
        match nodes.get(&real) {
            Some(Node::Dir) => {}
            Some(_) => return Err(FsError::Other(format!("{}: Failure", path))),
            None => return Err(FsError::NotFound(path.to_string())),
        }
        if nodes.keys().any(|candidate| Self::is_child(&real, candidate)) {
            return Err(FsError::Other(format!("{}: Failure", path)));
        }
        nodes.remove(&real);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        self.check(from)?;
        self.check(to)?;
        let mut nodes = self.nodes.lock().unwrap();
        let from = Self::resolve(&nodes, from, false);
        let to = Self::resolve(&nodes, to, false);
        if !nodes.contains_key(&from) {
            return Err(FsError::NotFound(from));
        }
        let prefix = format!("{}/", from);
        let moved: Vec<String> = nodes
            .keys()
            .filter(|k| **k == from || k.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader, FsError> {
        self.check(path)?;
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&Self::resolve(&nodes, path, true)) {
            Some(Node::File(data)) => Ok(Box::new(io::Cursor::new(data.clone()))),
            Some(_) => Err(FsError::Other(format!("{}: Failure", path))),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter, FsError> {
        self.check(path)?;
        let mut nodes = self.nodes.lock().unwrap();
        let real = Self::resolve(&nodes, path, true);
        match nodes.get(&get_parent_path(&real)) {
            Some(Node::Dir) => {}
            _ => return Err(FsError::NotFound(path.to_string())),
        }
        if let Some(Node::Dir) = nodes.get(&real) {
            return Err(FsError::Other(format!("{}: Failure", path)));
        }
        nodes.insert(real.clone(), Node::File(Vec::new()));
        Ok(Box::new(MemoryWriter {
            nodes: self.nodes.clone(),
            path: real,
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// 直接追加写入文件节点
struct MemoryWriter {
    nodes: Nodes,
    path: String,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(&self.path) {
            Some(Node::File(data)) => {
                data.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            _ => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotFound,
                "file vanished",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub const SYSINFO_OUTPUT: &str = "hostname=web-01\nip=10.0.0.5\nos=Debian GNU/Linux 12\n\
kernel=6.1.0-18-amd64\ncpu=\ncores=2\narch=x86_64\nload=0.01 0.03 0.00\n\
ram_total=2048000000\nram_used=512000000\nram_free=1536000000\n";

pub const DF_KIB_OUTPUT: &str = "Filesystem     1024-blocks    Used Available Capacity Mounted on\n\
/dev/vda1         20000000 5000000  15000000      25% /\n\
tmpfs               100000       0    100000       0% /run\n";

/// 只认识几条命令的脚本化 shell
#[derive(Default)]
pub struct FakeExec {
    closed: AtomicBool,
    pub commands: Mutex<Vec<String>>,
}

impl FakeExec {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExec for FakeExec {
    async fn exec(&self, command: &str) -> Result<CommandOutput, SshError> {
        if self.is_closed() {
            return Err(SshError::Disconnected("Session is disconnected".into()));
        }
        self.commands.lock().unwrap().push(command.to_string());

        let mut output = CommandOutput::default();
        match command {
            "echo hello" => {
                output.push_stdout(b"hello\n");
                output.exit_code = Some(0);
            }
            "true" => output.exit_code = Some(0),
            "ls /nope" => {
                output.push_stderr(b"ls: cannot access '/nope': No such file or directory\n");
                output.exit_code = Some(2);
            }
            "sleep 100" => output.exit_signal = Some("KILL".into()),
            "df -B1 -P" => {
                output.push_stderr(b"df: invalid option -- 'B'\n");
                output.exit_code = Some(1);
            }
            "df -kP" => {
                output.push_stdout(DF_KIB_OUTPUT.as_bytes());
                output.exit_code = Some(0);
            }
            script if script.contains("hostname=") => {
                output.push_stdout(SYSINFO_OUTPUT.as_bytes());
                output.exit_code = Some(1);
            }
            other => {
                output.push_stderr(format!("sh: {}: command not found\n", other).as_bytes());
                output.exit_code = Some(127);
            }
        }
        Ok(output)
    }

    async fn close(&self) -> Result<(), SshError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub const PASSWORD: &str = "secret";

/// 每次连接都创建一台新的内存主机
#[derive(Default)]
pub struct FakeConnector {
    pub connects: AtomicUsize,
    pub hosts: Mutex<Vec<(Arc<MemoryFs>, Arc<FakeExec>)>>,
}

impl FakeConnector {
    /// 最近一次连接的文件系统和 shell
    pub fn last(&self) -> (Arc<MemoryFs>, Arc<FakeExec>) {
        self.hosts.lock().unwrap().last().cloned().expect("no connection yet")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        _session_id: &str,
        config: SshConfig,
    ) -> Result<Connection, SessionError> {
        if config.host.ends_with(".invalid") {
            return Err(SshError::Resolve(format!("{}: no address found", config.address())).into());
        }
        match &config.auth {
            AuthMethod::Password(p) if p == PASSWORD => {}
            _ => return Err(SshError::Auth("Password authentication rejected".into()).into()),
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        let fs = Arc::new(MemoryFs::new(&format!("/home/{}", config.username)));
        let exec = Arc::new(FakeExec::default());
        self.hosts.lock().unwrap().push((fs.clone(), exec.clone()));
        Ok(Connection { fs, exec })
    }
}

pub fn manager(connector: Arc<FakeConnector>, settings: &AppSettings) -> SessionManager {
    SessionManager::new(
        connector,
        settings.connection.clone(),
        settings.sftp.clone(),
    )
}

// SSH 会话管理
// 连接成功后的会话对象，每个请求按需打开独立通道

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use russh::client::Handle;
use russh::client::Msg;
use russh::ChannelMsg;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::SshError;
use super::handler::SshClientHandler;

/// SSH 会话（连接成功后）
/// 内部持有 Handle，支持并发打开多个通道
pub struct SshSession {
    /// 会话 ID
    id: String,
    /// 共享的 russh Handle（Arc 包装）
    handle: Arc<Handle<SshClientHandler>>,
    /// 服务器地址（host:port）
    address: String,
    /// 连接状态
    is_connected: AtomicBool,
}

impl SshSession {
    /// 创建新的会话
    pub fn new(id: String, handle: Arc<Handle<SshClientHandler>>, address: String) -> Self {
        Self {
            id,
            handle,
            address,
            is_connected: AtomicBool::new(true),
        }
    }

    /// 检查会话是否活跃
    pub fn is_alive(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed) && !self.handle.is_closed()
    }

    /// 获取 Handle 引用（供 SFTP 子系统使用）
    pub fn handle(&self) -> Arc<Handle<SshClientHandler>> {
        self.handle.clone()
    }

    /// 打开执行通道
    pub async fn open_exec(&self) -> Result<ExecChannel, SshError> {
        if !self.is_alive() {
            return Err(SshError::Disconnected(
                "Session is disconnected".to_string(),
            ));
        }

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(SshError::from)?;

        Ok(ExecChannel::new(channel))
    }

    /// 关闭会话，重复调用无副作用
    pub async fn close(&self) -> Result<(), SshError> {
        if !self.is_connected.swap(false, Ordering::Relaxed) {
            return Ok(());
        }
        info!("[SSH] Closing session {} ({})", self.id, self.address);
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(SshError::from)
    }
}

// 使用 russh::client::Msg 作为消息类型
type RusshChannel = russh::Channel<Msg>;

/// 执行通道（每条命令一个通道）
pub struct ExecChannel {
    channel: Mutex<RusshChannel>,
}

impl ExecChannel {
    fn new(channel: RusshChannel) -> Self {
        Self {
            channel: Mutex::new(channel),
        }
    }

    /// 执行命令并获取输出
    pub async fn exec(&self, command: &str) -> Result<CommandOutput, SshError> {
        let mut channel = self.channel.lock().await;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::Channel(e.to_string()))?;

        let mut output = CommandOutput::default();

        // 服务器可能在 Eof 之后才发送 ExitStatus，所以一直读到通道关闭
        while let Some(channel_msg) = channel.wait().await {
            match channel_msg {
                ChannelMsg::Data { data } => {
                    output.push_stdout(&data);
                }
                ChannelMsg::ExtendedData { data, ext } => {
                    if ext == 1 {
                        output.push_stderr(&data);
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_code = Some(exit_status);
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    debug!("[SSH] Command terminated by signal {:?}", signal_name);
                    output.exit_signal = Some(format!("{:?}", signal_name));
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        Ok(output)
    }
}

/// 命令输出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: Vec<u8>,
    /// 标准错误
    pub stderr: Vec<u8>,
    /// 按到达顺序合并的输出
    pub combined: Vec<u8>,
    /// 退出码（被信号终止时没有）
    pub exit_code: Option<u32>,
    /// 终止信号
    pub exit_signal: Option<String>,
}

impl CommandOutput {
    /// 追加标准输出
    pub fn push_stdout(&mut self, data: &[u8]) {
        self.stdout.extend_from_slice(data);
        self.combined.extend_from_slice(data);
    }

    /// 追加标准错误
    pub fn push_stderr(&mut self, data: &[u8]) {
        self.stderr.extend_from_slice(data);
        self.combined.extend_from_slice(data);
    }

    /// 获取标准输出字符串
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// 获取标准错误字符串
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// 获取合并输出字符串
    pub fn combined_string(&self) -> String {
        String::from_utf8_lossy(&self.combined).to_string()
    }

    /// 检查命令是否成功
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

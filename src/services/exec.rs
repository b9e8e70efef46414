// 远程命令执行服务

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::ssh::{CommandOutput, SshError, SshSession};

/// 远程命令执行抽象，每次调用使用一个新的通道
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// 执行一条命令，等待其结束
    async fn exec(&self, command: &str) -> Result<CommandOutput, SshError>;

    /// 断开底层连接
    async fn close(&self) -> Result<(), SshError>;
}

#[async_trait]
impl RemoteExec for SshSession {
    async fn exec(&self, command: &str) -> Result<CommandOutput, SshError> {
        let channel = self.open_exec().await?;
        channel.exec(command).await
    }

    async fn close(&self) -> Result<(), SshError> {
        SshSession::close(self).await
    }
}

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    /// stdout 与 stderr 按到达顺序合并
    pub output: String,
    /// 退出码，没有退出状态（被信号终止）时为 -1
    pub exit_code: i64,
}

impl From<CommandOutput> for ExecResult {
    fn from(output: CommandOutput) -> Self {
        Self {
            output: output.combined_string(),
            exit_code: output.exit_code.map(i64::from).unwrap_or(-1),
        }
    }
}

/// 执行用户命令（调用方保证命令非空）
pub async fn run_command(exec: &dyn RemoteExec, command: &str) -> Result<ExecResult, SshError> {
    info!("[Exec] Running command ({} bytes)", command.len());
    let output = exec.exec(command).await?;
    debug!(
        "[Exec] Command finished, exit={:?}, signal={:?}",
        output.exit_code, output.exit_signal
    );
    Ok(ExecResult::from(output))
}

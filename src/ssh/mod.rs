// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SshConfig, AuthMethod)
// - error: 错误类型 (SshError)
// - handler: russh Handler 实现
// - client: SSH 客户端核心
// - session: SSH 会话 (SshSession, ExecChannel)

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;

// 公开导出
pub use client::SshClient;
pub use config::{AuthMethod, KeepaliveConfig, SshConfig};
pub use error::{FailureKind, SshError};
pub use session::{CommandOutput, ExecChannel, SshSession};

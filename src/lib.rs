// VPS Master 后端
// 本地 HTTP 服务，通过 SSH/SFTP 管理一台远程主机

pub mod api;
pub mod constants;
pub mod models;
pub mod services;
pub mod ssh;

// Monitor 监控数据模型

use serde::Serialize;

/// 主机信息快照，缺失的字段不输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SysInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    /// 1/5/15 分钟负载
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    /// 内存总量（字节）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_free: Option<String>,
}

/// 挂载点使用情况
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEntry {
    /// 设备
    pub filesystem: String,
    /// 总容量（字节）
    pub total: u64,
    /// 已用（字节）
    pub used: u64,
    /// 可用（字节）
    pub available: u64,
    /// 使用率，如 "42%"
    pub use_percent: String,
    /// 挂载点
    pub mounted_on: String,
}

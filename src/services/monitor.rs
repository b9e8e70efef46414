// Monitor 后端服务
// 通过 SSH 执行 Shell 脚本收集主机信息和磁盘使用情况

use tracing::{debug, trace, warn};

use crate::models::monitor::{DiskEntry, SysInfo};
use crate::services::exec::RemoteExec;
use crate::ssh::SshError;

/// 获取主机信息快照
/// 脚本本身的退出码不影响结果，缺失的字段直接省略
pub async fn collect_sysinfo(exec: &dyn RemoteExec) -> Result<SysInfo, SshError> {
    let output = exec.exec(SYSTEM_INFO_SCRIPT).await?;
    if !output.is_success() {
        debug!(
            "[Monitor] System info script exited with {:?}: {}",
            output.exit_code,
            output.stderr_string()
        );
    }

    let raw = output.stdout_string();
    trace!("[Monitor] System info raw output: {}", raw);
    Ok(parse_sysinfo(&raw))
}

/// 获取磁盘使用情况
/// 优先 `df -B1 -P`，不支持时退回 `df -kP` 并换算为字节
pub async fn collect_diskinfo(exec: &dyn RemoteExec) -> Result<Vec<DiskEntry>, SshError> {
    let output = exec.exec(DISK_BYTES_COMMAND).await?;
    if output.is_success() {
        return Ok(parse_df(&output.stdout_string(), 1));
    }

    warn!(
        "[Monitor] `{}` failed ({:?}), falling back to `{}`",
        DISK_BYTES_COMMAND, output.exit_code, DISK_KIB_COMMAND
    );
    let output = exec.exec(DISK_KIB_COMMAND).await?;
    if !output.is_success() {
        return Err(SshError::Channel(format!(
            "df command failed: {}",
            output.stderr_string().trim()
        )));
    }
    Ok(parse_df(&output.stdout_string(), 1024))
}

/// 解析 key=value 输出，未知的键忽略，空值省略
pub fn parse_sysinfo(raw: &str) -> SysInfo {
    let mut info = SysInfo::default();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let slot = match key.trim() {
            "hostname" => &mut info.hostname,
            "ip" => &mut info.ip,
            "os" => &mut info.os,
            "kernel" => &mut info.kernel,
            "cpu" => &mut info.cpu,
            "cores" => &mut info.cores,
            "arch" => &mut info.arch,
            "load" => &mut info.load,
            "uptime" => &mut info.uptime,
            "ram_total" => &mut info.ram_total,
            "ram_used" => &mut info.ram_used,
            "ram_free" => &mut info.ram_free,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    info
}

/// 解析 POSIX 格式的 df 输出
/// scale 为每个块的字节数；挂载点中的空格保留
pub fn parse_df(raw: &str, scale: u64) -> Vec<DiskEntry> {
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let filesystem = fields[0];
            if is_pseudo_filesystem(filesystem) {
                return None;
            }

            let bytes = |s: &str| s.parse::<u64>().unwrap_or(0).saturating_mul(scale);
            Some(DiskEntry {
                filesystem: filesystem.to_string(),
                total: bytes(fields[1]),
                used: bytes(fields[2]),
                available: bytes(fields[3]),
                use_percent: fields[4].to_string(),
                mounted_on: fields[5..].join(" "),
            })
        })
        .collect()
}

fn is_pseudo_filesystem(filesystem: &str) -> bool {
    filesystem.starts_with("tmpfs")
        || filesystem.starts_with("devtmpfs")
        || filesystem.starts_with("udev")
        || filesystem == "none"
        || filesystem == "overlay"
}

const DISK_BYTES_COMMAND: &str = "df -B1 -P";
const DISK_KIB_COMMAND: &str = "df -kP";

/// 主机信息脚本，每行输出一个 key=value
const SYSTEM_INFO_SCRIPT: &str = r#"
echo "hostname=$(hostname 2>/dev/null)"
echo "ip=$(hostname -I 2>/dev/null | awk '{print $1}')"
# 发行版名称（优先使用 /etc/os-release）
if [ -f /etc/os-release ]; then
    echo "os=$(. /etc/os-release && echo "${PRETTY_NAME:-${NAME} ${VERSION_ID}}")"
else
    echo "os=$(uname -o 2>/dev/null || uname -s 2>/dev/null)"
fi
echo "kernel=$(uname -r 2>/dev/null)"
echo "arch=$(uname -m 2>/dev/null)"
echo "uptime=$(uptime -p 2>/dev/null || uptime 2>/dev/null)"
echo "cpu=$(grep -m1 'model name' /proc/cpuinfo 2>/dev/null | cut -d: -f2 | sed 's/^ *//')"
echo "cores=$(nproc 2>/dev/null)"
echo "load=$(cut -d' ' -f1-3 /proc/loadavg 2>/dev/null)"
# 内存（字节）
free -b 2>/dev/null | awk '/^Mem:/ {print "ram_total=" $2; print "ram_used=" $3; print "ram_free=" $4}'
"#;

// 本地配置持久化服务

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_DIR_NAME, ENV_CONFIG_PATH, ENV_LISTEN_HOST, ENV_LISTEN_PORT};
use crate::models::AppSettings;

/// 获取配置目录路径
/// macOS: ~/Library/Application Support/vpsmaster
/// Linux: ~/.config/vpsmaster
/// Windows: C:\Users\<用户名>\AppData\Roaming\vpsmaster
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("无法获取系统配置目录")?
        .join(CONFIG_DIR_NAME);
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).context("无法创建配置目录")?;
    }
    Ok(config_dir)
}

/// 获取设置配置文件路径（VPSMASTER_CONFIG 优先）
pub fn get_settings_file() -> Result<PathBuf> {
    match std::env::var_os(ENV_CONFIG_PATH) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(get_config_dir()?.join("settings.json")),
    }
}

/// 加载应用设置，并应用环境变量中的监听地址
pub fn load_settings() -> Result<AppSettings> {
    let path = get_settings_file()?;
    let settings = load_settings_from(&path)?;
    apply_env_overrides(
        settings,
        std::env::var(ENV_LISTEN_HOST).ok(),
        std::env::var(ENV_LISTEN_PORT).ok(),
    )
}

/// 从指定文件加载设置，文件不存在时使用默认值
pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("无法读取设置配置文件 {}", path.display()))?;
    let settings: AppSettings = serde_json::from_str(&content)
        .with_context(|| format!("无法解析设置配置文件 {}", path.display()))?;
    Ok(settings)
}

/// 保存应用设置
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(&get_settings_file()?, settings)
}

/// 保存设置到指定文件
pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("无法序列化设置配置")?;
    fs::write(path, content).context("无法写入设置配置文件")?;
    Ok(())
}

/// 用环境变量覆盖监听地址
pub fn apply_env_overrides(
    mut settings: AppSettings,
    host: Option<String>,
    port: Option<String>,
) -> Result<AppSettings> {
    if let Some(host) = host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
        settings.server.host = host;
    }
    if let Some(port) = port.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        settings.server.port = port
            .parse()
            .with_context(|| format!("{} 不是有效的端口: {}", ENV_LISTEN_PORT, port))?;
    }
    Ok(settings)
}

// 全局默认值

/// 默认监听地址（只对本机开放）
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
/// 默认监听端口，前端写死了这个端口
pub const DEFAULT_LISTEN_PORT: u16 = 8899;

/// 在线编辑最大 5MB
pub const DEFAULT_MAX_EDIT_BYTES: u64 = 5 * 1024 * 1024;
/// 上传最大 100MB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
/// 目录打包最大 512MB
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

/// 打包下载时默认跳过的目录
pub const DEFAULT_ARCHIVE_SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".cache",
    "vendor",
    ".next",
    "dist",
];

/// 配置目录名
pub const CONFIG_DIR_NAME: &str = "vpsmaster";

/// 环境变量：配置文件路径
pub const ENV_CONFIG_PATH: &str = "VPSMASTER_CONFIG";
/// 环境变量：监听地址
pub const ENV_LISTEN_HOST: &str = "VPSMASTER_HOST";
/// 环境变量：监听端口
pub const ENV_LISTEN_PORT: &str = "VPSMASTER_PORT";

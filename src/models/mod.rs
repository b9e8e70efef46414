// 数据模型模块

pub mod monitor;
pub mod settings;
pub mod sftp;

pub use monitor::{DiskEntry, SysInfo};
pub use settings::AppSettings;

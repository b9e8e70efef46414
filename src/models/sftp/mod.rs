// SFTP 数据模型

mod types;

pub use types::*;

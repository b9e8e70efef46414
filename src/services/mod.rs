// 后端服务层

pub mod exec;
pub mod monitor;
pub mod session;
pub mod sftp;
pub mod storage;

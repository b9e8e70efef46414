// SFTP 后端服务

pub mod archive;
mod error;
mod fs;
mod gateway;
pub mod path;
mod service;

pub use error::FsError;
pub use fs::{RemoteFs, RemoteReader, RemoteWriter};
pub use gateway::{BatchDeleteOutcome, DirArchive, Download, Gateway, UploadOutcome};
pub use service::SftpService;

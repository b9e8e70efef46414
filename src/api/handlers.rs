// HTTP 处理函数

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::error::ApiError;
use super::types::*;
use super::AppState;
use crate::models::monitor::{DiskEntry, SysInfo};
use crate::models::sftp::{FileContent, FileEntry};
use crate::services::exec::{run_command, ExecResult};
use crate::services::monitor;
use crate::services::sftp::FsError;

fn require_path(path: &str) -> Result<&str, ApiError> {
    if path.trim().is_empty() {
        return Err(ApiError::BadRequest("Path is required".to_string()));
    }
    Ok(path)
}

fn require_command(command: &str) -> Result<&str, ApiError> {
    if command.trim().is_empty() {
        return Err(ApiError::BadRequest("Command is required".to_string()));
    }
    Ok(command)
}

fn attachment(file_name: &str) -> Result<HeaderValue, ApiError> {
    let value = format!("attachment; filename=\"{}\"", file_name.replace('"', "'"));
    HeaderValue::from_bytes(value.as_bytes())
        .map_err(|e| ApiError::Fs(FsError::InvalidPath(format!("{}: {}", file_name, e))))
}

/// POST /connect
pub async fn connect(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let Json(req) = payload?;
    let session = state
        .sessions
        .connect(&req.host, req.port, &req.user, req.auth())
        .await?;

    Ok(Json(ConnectResponse {
        status: "connected",
        session_id: session.id.clone(),
        home: session.gateway.home().to_string(),
    }))
}

/// GET|POST /disconnect
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<StatusOnly> {
    state.sessions.disconnect().await;
    Json(StatusOnly {
        status: "disconnected",
    })
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let response = match state.sessions.status().await {
        Some(session) => StatusResponse::from(session.as_ref()),
        None => StatusResponse::disconnected(),
    };
    Json(response)
}

/// GET /files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let Query(query) = query?;
    let session = state.sessions.current().await?;
    let entries = session
        .gateway
        .list(&query.path, query.sort, query.hidden)
        .await?;
    Ok(Json(entries))
}

/// POST /upload（multipart: file, path[, subpath]）
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let session = state.sessions.current().await?;
    let limit = state.settings.sftp.max_upload_bytes;

    let mut dir = String::new();
    let mut subpath: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    // 前端先发送 file 再发送 path，所以文件内容先缓存在内存中
    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "path" => dir = field.text().await?,
            "subpath" => subpath = Some(field.text().await?),
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    let size = (data.len() + chunk.len()) as u64;
                    if size > limit {
                        return Err(FsError::TooLarge { size, limit }.into());
                    }
                    data.extend_from_slice(&chunk);
                }
                file = Some((name, data));
            }
            _ => {}
        }
    }

    let (name, data) =
        file.ok_or_else(|| ApiError::BadRequest("Failed to get file: missing file field".into()))?;
    let outcome = session
        .gateway
        .upload(&dir, &name, subpath.as_deref(), data.as_slice())
        .await?;

    Ok(Json(UploadResponse {
        status: "uploaded",
        filename: outcome.filename,
        path: outcome.path,
        size: outcome.size,
    }))
}

/// DELETE /delete
pub async fn delete(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<StatusOnly>, ApiError> {
    let Query(query) = query?;
    let path = require_path(&query.path)?;
    let session = state.sessions.current().await?;
    session.gateway.delete(path).await?;
    Ok(Json(StatusOnly { status: "deleted" }))
}

/// POST /batchdelete
pub async fn batch_delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchDeleteRequest>, JsonRejection>,
) -> Result<Json<BatchDeleteResponse>, ApiError> {
    let Json(req) = payload?;
    let session = state.sessions.current().await?;
    let outcome = session.gateway.delete_many(&req.paths).await;

    let (status, failed, error) = match outcome.failed {
        Some((path, e)) => ("partial", Some(path), Some(e.to_string())),
        None => ("deleted", None, None),
    };
    Ok(Json(BatchDeleteResponse {
        status,
        deleted: outcome.deleted,
        failed,
        error,
    }))
}

/// POST /rename
pub async fn rename(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<StatusOnly>, ApiError> {
    let Json(req) = payload?;
    let from = require_path(&req.old_path)?;
    let to = require_path(&req.new_path)?;
    let session = state.sessions.current().await?;
    session.gateway.rename(from, to).await?;
    Ok(Json(StatusOnly { status: "renamed" }))
}

/// POST /mkdir
pub async fn mkdir(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MkdirRequest>, JsonRejection>,
) -> Result<Json<StatusOnly>, ApiError> {
    let Json(req) = payload?;
    let path = require_path(&req.path)?;
    let session = state.sessions.current().await?;
    session.gateway.mkdir(path).await?;
    Ok(Json(StatusOnly { status: "created" }))
}

/// GET /download
pub async fn download(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let path = require_path(&query.path)?;
    let session = state.sessions.current().await?;
    let download = session.gateway.download(path).await?;
    info!("[HTTP] Streaming {} ({} bytes)", path, download.size);

    let headers = [
        (header::CONTENT_DISPOSITION, attachment(&download.file_name)?),
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(download.size)),
    ];
    let body = Body::from_stream(ReaderStream::new(download.reader));
    Ok((headers, body).into_response())
}

/// GET /downloaddir
pub async fn download_dir(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DownloadDirQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let path = require_path(&query.path)?;
    let session = state.sessions.current().await?;
    let archive = session
        .gateway
        .download_dir(path, &query.exclude_list())
        .await?;

    let headers = [
        (header::CONTENT_DISPOSITION, attachment(&archive.file_name)?),
        (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
    ];
    Ok((headers, archive.bytes).into_response())
}

/// GET /exists
pub async fn exists(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let Query(query) = query?;
    let path = require_path(&query.path)?;
    let session = state.sessions.current().await?;
    let exists = session.gateway.exists(path).await?;
    Ok(Json(ExistsResponse { exists }))
}

/// GET /readfile
pub async fn read_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<FileContent>, ApiError> {
    let Query(query) = query?;
    let path = require_path(&query.path)?;
    let session = state.sessions.current().await?;
    Ok(Json(session.gateway.read(path).await?))
}

/// POST /writefile
pub async fn write_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WriteFileRequest>, JsonRejection>,
) -> Result<Json<WriteFileResponse>, ApiError> {
    let Json(req) = payload?;
    let path = require_path(&req.path)?;
    let session = state.sessions.current().await?;
    let size = session.gateway.write(path, &req.content).await?;
    Ok(Json(WriteFileResponse {
        status: "saved",
        size,
    }))
}

/// POST /exec
pub async fn exec(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecRequest>, JsonRejection>,
) -> Result<Json<ExecResult>, ApiError> {
    let Json(req) = payload?;
    let command = require_command(&req.command)?;
    let session = state.sessions.current().await?;
    Ok(Json(run_command(session.exec.as_ref(), command).await?))
}

/// GET /sysinfo
pub async fn sysinfo(State(state): State<Arc<AppState>>) -> Result<Json<SysInfo>, ApiError> {
    let session = state.sessions.current().await?;
    Ok(Json(monitor::collect_sysinfo(session.exec.as_ref()).await?))
}

/// GET /diskinfo
pub async fn diskinfo(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DiskEntry>>, ApiError> {
    let session = state.sessions.current().await?;
    Ok(Json(monitor::collect_diskinfo(session.exec.as_ref()).await?))
}

/// 未知路由
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

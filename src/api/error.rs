// HTTP 错误响应
// 所有错误都以 {"error": "..."} 返回

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use crate::services::session::SessionError;
use crate::services::sftp::FsError;
use crate::ssh::{FailureKind, SshError};

/// API 错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ssh(#[from] SshError),

    #[error(transparent)]
    Fs(#[from] FsError),

    /// 请求参数或请求体不合法
    #[error("{0}")]
    BadRequest(String),

    /// 未知路由
    #[error("Not found")]
    NotFound,
}

impl ApiError {
    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(SessionError::NotConnected) => StatusCode::BAD_REQUEST,
            ApiError::Session(SessionError::Ssh(e)) | ApiError::Ssh(e) => ssh_status(e),
            ApiError::Session(SessionError::Sftp(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Fs(e) => fs_status(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

fn ssh_status(err: &SshError) -> StatusCode {
    match err.kind() {
        FailureKind::MalformedInput => StatusCode::BAD_REQUEST,
        FailureKind::AuthFailed => StatusCode::UNAUTHORIZED,
        FailureKind::Unreachable if matches!(err, SshError::Timeout(_)) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        FailureKind::Unreachable | FailureKind::Protocol => StatusCode::BAD_GATEWAY,
    }
}

fn fs_status(err: &FsError) -> StatusCode {
    match err {
        FsError::NotFound(_) => StatusCode::NOT_FOUND,
        FsError::PermissionDenied(_) | FsError::OutsideRoot(_) => StatusCode::FORBIDDEN,
        FsError::TargetExists(_) | FsError::AlreadyExists(_) => StatusCode::CONFLICT,
        FsError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        FsError::NotADirectory(_)
        | FsError::IsADirectory(_)
        | FsError::ParentMissing(_)
        | FsError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        FsError::NoSpace(_) => StatusCode::INSUFFICIENT_STORAGE,
        FsError::ConnectionLost(_) => StatusCode::BAD_GATEWAY,
        FsError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            warn!("[HTTP] {} {}", status.as_u16(), message);
        } else {
            debug!("[HTTP] {} {}", status.as_u16(), message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(format!("Invalid form: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Failed to parse form: {}", err.body_text()))
    }
}

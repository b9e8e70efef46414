// HTTP API
//
// 模块结构:
// - error: ApiError 及状态码映射
// - types: 请求与响应结构
// - handlers: 各端点处理函数

pub mod error;
pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::models::AppSettings;
use crate::services::session::SessionManager;

pub use error::ApiError;

/// 共享的应用状态
pub struct AppState {
    pub sessions: SessionManager,
    pub settings: AppSettings,
}

impl AppState {
    pub fn new(sessions: SessionManager, settings: AppSettings) -> Self {
        Self { sessions, settings }
    }
}

/// 构建全部路由
pub fn router(state: Arc<AppState>) -> Router {
    // JSON 请求体（writefile）与上传共用同一上限，上传自行按块检查
    let body_limit = usize::try_from(state.settings.sftp.max_upload_bytes).unwrap_or(usize::MAX);
    let cors = cors_layer(&state.settings.server.allowed_origins);

    Router::new()
        .route("/connect", post(handlers::connect))
        .route(
            "/disconnect",
            get(handlers::disconnect).post(handlers::disconnect),
        )
        .route("/status", get(handlers::status))
        .route("/files", get(handlers::list_files))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/delete", delete(handlers::delete))
        .route("/batchdelete", post(handlers::batch_delete))
        .route("/rename", post(handlers::rename))
        .route("/mkdir", post(handlers::mkdir))
        .route("/download", get(handlers::download))
        .route("/downloaddir", get(handlers::download_dir))
        .route("/exists", get(handlers::exists))
        .route("/readfile", get(handlers::read_file))
        .route("/writefile", post(handlers::write_file))
        .route("/exec", post(handlers::exec))
        .route("/sysinfo", get(handlers::sysinfo))
        .route("/diskinfo", get(handlers::diskinfo))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS：未配置来源时允许任意来源
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("[HTTP] Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_DISPOSITION])
}

//! HTTP boundary: an axum router over [`BlogRepository`].

use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::Request,
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::{origin::ServingOrigin, repository::BlogRepository, store::DocumentStore};

mod admin;
mod discussion;
mod engagement;
pub mod error;
mod posts;

pub use self::error::{ApiError, ApiResult};

/// Shared handler state.
pub struct AppState<S> {
    pub repository: BlogRepository<S>,
    /// Fallbacks for the serving origin when a request names none.
    pub public_scheme: String,
    pub public_host: String,
}

pub type SharedState<S> = Arc<AppState<S>>;

impl<S> AppState<S> {
    pub fn new(repository: BlogRepository<S>, public_scheme: impl Into<String>, public_host: impl Into<String>) -> Self {
        Self {
            repository,
            public_scheme: public_scheme.into(),
            public_host: public_host.into(),
        }
    }

    pub fn origin(&self, headers: &HeaderMap) -> ServingOrigin {
        ServingOrigin::from_headers(headers, &self.public_scheme, &self.public_host)
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Logs method, path, status and latency of every request.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    log::info!(
        "{method} {path} -> {} ({} ms)",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: DocumentStore,
{
    let api = Router::new()
        .route("/posts", get(posts::list_posts::<S>))
        .route("/posts/:post", get(posts::post_detail::<S>))
        .route("/posts/:post/users/:user/status", get(engagement::status::<S>))
        .route("/comments", post(discussion::add_comment::<S>))
        .route("/replies", post(discussion::add_reply::<S>))
        .route("/likes", post(engagement::set_like::<S>))
        .route("/saves", post(engagement::set_save::<S>))
        .route("/users/:user/saved", get(posts::saved_posts::<S>))
        .route("/auth/register", post(admin::register::<S>))
        .route("/admin/posts", post(admin::create_post::<S>))
        .route(
            "/admin/categories",
            get(admin::list_categories::<S>).post(admin::create_category::<S>),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn(log_requests))
        .with_state(Arc::new(state))
}

/// Serves `router` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("listening on {addr}");
    }
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutdown requested");
    }
}

//! HTTP adapter over [`JobService`].
//!
//! Handlers only translate between JSON and the service calls; none of them
//! waits for a job to run.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::analysis::{AnalysisKind, Parameters};
use crate::scheduler::JobId;
use crate::service::{JobService, PollResponse, SubmitError};

#[derive(Clone)]
pub struct ApiState {
    pub service: JobService,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum SubmitResponse {
    Success { job_id: JobId },
    Error { reason: String },
}

pub fn router(service: JobService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/index", get(index_handler))
        .route("/api/get_results/{job_id}", get(get_results_handler))
        .route("/api/graceful_shutdown", get(graceful_shutdown_handler))
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/num_jobs", get(num_jobs_handler));

    for kind in AnalysisKind::ALL {
        router = router.route(
            &format!("/api/{}", kind.as_str()),
            post(
                move |State(state): State<ApiState>,
                      body: Result<Json<Parameters>, JsonRejection>| async move {
                    match body {
                        Ok(Json(params)) => submit(state, kind, params),
                        Err(rejection) => reject_body(kind, rejection),
                    }
                },
            ),
        );
    }

    router.layer(cors).with_state(ApiState { service })
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, service: JobService, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Starting HTTP server");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

fn submit(state: ApiState, kind: AnalysisKind, params: Parameters) -> (StatusCode, Json<SubmitResponse>) {
    match state.service.submit(kind, params) {
        Ok(job_id) => (StatusCode::OK, Json(SubmitResponse::Success { job_id })),
        Err(e) => {
            let code = match e {
                SubmitError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
                SubmitError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            };
            (code, Json(SubmitResponse::Error { reason: e.to_string() }))
        }
    }
}

/// Unreadable bodies get the same status object as invalid parameters
/// instead of the extractor's plain-text reply.
fn reject_body(kind: AnalysisKind, rejection: JsonRejection) -> (StatusCode, Json<SubmitResponse>) {
    tracing::warn!(kind = %kind, error = %rejection.body_text(), "Rejecting submission body");
    (
        StatusCode::BAD_REQUEST,
        Json(SubmitResponse::Error {
            reason: format!("invalid parameters: {}", rejection.body_text()),
        }),
    )
}

async fn get_results_handler(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Json<PollResponse> {
    match job_id.parse::<JobId>() {
        Ok(id) => Json(state.service.poll(id)),
        Err(_) => Json(PollResponse::Error {
            reason: "Invalid job_id".to_string(),
        }),
    }
}

async fn graceful_shutdown_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.service.signal_shutdown())
}

async fn list_jobs_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "done",
        "data": state.service.list_jobs(),
    }))
}

async fn num_jobs_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "done",
        "data": state.service.outstanding_count(),
    }))
}

async fn index_handler() -> String {
    let mut routes = vec![
        "GET /api/get_results/{job_id}".to_string(),
        "GET /api/graceful_shutdown".to_string(),
        "GET /api/jobs".to_string(),
        "GET /api/num_jobs".to_string(),
    ];
    routes.extend(
        AnalysisKind::ALL
            .iter()
            .map(|kind| format!("POST /api/{}", kind.as_str())),
    );
    format!("Interact with the server using one of the defined routes:\n{}\n", routes.join("\n"))
}

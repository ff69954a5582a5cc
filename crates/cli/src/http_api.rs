use agentconf_synth::ConfigService;
use agentconf_topology::{ProjectId, TopologyError, TopologyProvider};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

pub(crate) fn router<P>(service: Arc<ConfigService<P>>) -> Router
where
    P: TopologyProvider + 'static,
{
    Router::new()
        .route("/v1/config", get(config_handler::<P>))
        .route("/health", get(health_handler))
        .with_state(service)
}

fn project_from_headers(headers: &HeaderMap) -> Option<ProjectId> {
    let value = headers.get(API_KEY_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(ProjectId::new(value))
}

pub(crate) fn status_for(err: &TopologyError) -> StatusCode {
    match err {
        TopologyError::SnapshotUnavailable(_) => StatusCode::NOT_FOUND,
        TopologyError::WindowEmpty => StatusCode::NO_CONTENT,
        TopologyError::UpstreamFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn config_handler<P>(
    State(service): State<Arc<ConfigService<P>>>,
    headers: HeaderMap,
) -> Response
where
    P: TopologyProvider + 'static,
{
    let Some(project) = project_from_headers(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("missing {API_KEY_HEADER} header"),
        )
            .into_response();
    };

    match service.agent_config(&project).await {
        Ok(config) => Json(config).into_response(),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                log::error!("Project {project}: {err:#}");
            } else {
                log::warn!("Project {project}: {err}");
            }
            (status, err.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

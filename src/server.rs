use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    store::{IssueStore, StoreError},
    types::{AssigneeChange, CreateIssueRequest, Issue, IssueDetail, UpdateIssueRequest},
};

#[derive(Clone)]
pub struct AppState {
    config: Config,
    store: Arc<IssueStore>,
    started_at: DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, store: Arc<IssueStore>) -> Self {
        Self {
            config,
            store,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    uptime_seconds: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIssueBody {
    #[serde(default)]
    title: String,
    description: Option<String>,
    user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateIssueBody {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    // None: no change, 0: remove assignee
    user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct IssuesResponse {
    issues: Vec<Issue>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/issue", post(create_issue))
        .route("/issues", get(list_issues))
        .route("/issue/:id", get(get_issue).patch(update_issue))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = (Utc::now() - state.started_at).num_seconds();
    Json(HealthResponse {
        status: "ok",
        service: state.config.service_name,
        uptime_seconds,
    })
}

async fn create_issue(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateIssueBody>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let issue = state
        .store
        .create(CreateIssueRequest {
            title: body.title,
            description: body.description,
            assignee_id: body.user_id,
        })
        .await
        .map_err(ApiError::from_store)?;
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<IssuesResponse>, ApiError> {
    let issues = state
        .store
        .list(query.status.as_deref())
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(IssuesResponse { issues }))
}

async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IssueDetail>, ApiError> {
    let id = parse_issue_id(&id)?;
    let detail = state.store.get(id).await.map_err(ApiError::from_store)?;
    Ok(Json(detail))
}

async fn update_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateIssueBody>,
) -> Result<Json<Issue>, ApiError> {
    let id = parse_issue_id(&id)?;
    let issue = state
        .store
        .update(
            id,
            UpdateIssueRequest {
                title: body.title,
                description: body.description,
                status: body.status,
                assignee: AssigneeChange::from_wire(body.user_id),
            },
        )
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(issue))
}

// Ids are parsed from the raw path segment so malformed and non-positive
// values produce the contract's error body instead of a plain-text rejection.
fn parse_issue_id(raw: &str) -> Result<u64, ApiError> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::Validation(format!("invalid issue id '{raw}'"))),
    }
}

/// `axum::Json` with the rejection mapped into [`ApiError`] so malformed
/// bodies share the `{"error", "code"}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct AppJson<T>(T);

enum ApiError {
    Validation(String),
    NotFound(String),
    Forbidden(String),
}

impl ApiError {
    fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(format!("issue {id} not found")),
            StoreError::TerminalIssue(_) => Self::Forbidden(error.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(_: JsonRejection) -> Self {
        Self::Validation("invalid JSON body".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
        };
        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": status.as_u16(),
            })),
        )
            .into_response()
    }
}

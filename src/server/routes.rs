use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use crate::server::SharedState;
use crate::record::StudentFields;
use crate::Error;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Substring matched against name, email and city
    pub search: Option<String>,
}

/// Handler-level failures, rendered as `{success: false, error}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Student not found")]
    NotFound,

    #[error("Endpoint not found")]
    NoRoute,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::NoRoute => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(_) | Error::InvalidBody => ApiError::BadRequest(err.to_string()),
            Error::Conflict(_) => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"success": false, "error": self.to_string()});
        (self.status(), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Ids that are not integers name no student
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

/// Validate a request body before it reaches the store
fn parse_fields(body: &[u8]) -> ApiResult<StudentFields> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::from(Error::InvalidBody))?;
    Ok(StudentFields::from_json(&value)?)
}

pub async fn list_students(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let students = match params.search {
        Some(term) => state.store.search(&term).await?,
        None => state.store.list_all().await?,
    };
    Ok(Json(json!({"success": true, "data": students})))
}

pub async fn get_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    let student = state.store.get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({"success": true, "data": student})))
}

pub async fn create_student(
    State(state): State<SharedState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let fields = parse_fields(&body)?;
    let id = state.store.add(&fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "message": "Student added successfully", "id": id})),
    ))
}

pub async fn update_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    let fields = parse_fields(&body)?;
    if !state.store.update(id, &fields).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({"success": true, "message": "Student updated successfully"})))
}

pub async fn delete_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({"success": true, "message": "Student deleted successfully"})))
}

/// Unmatched paths under `/api`
pub async fn no_route() -> ApiError {
    ApiError::NoRoute
}

/// Unsupported methods on a known `/api` path
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Liveness probe for load balancers
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "database": "connected"})),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "error": e.to_string()})),
            )
        }
    }
}

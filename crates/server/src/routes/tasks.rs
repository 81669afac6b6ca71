use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    task::{Task, TaskError},
    user::User,
};
use serde_json::Value;
use tasks::{validate_create, validate_update};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_task_middleware, routes::insights};

pub async fn get_tasks(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_for_user(&state.db().db, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let data = validate_create(&payload)?;
    let task = Task::create(&state.db().db, user.id, &data, Uuid::new_v4()).await?;

    tracing::debug!(task_id = %task.id, "Created task");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(task)),
    ))
}

pub async fn update_task(
    Extension(existing): Extension<Task>,
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let patch = validate_update(&payload)?;
    let data = patch.apply(existing.to_data());

    let task = Task::update(&state.db().db, existing.id, user.id, &data)
        .await?
        .ok_or(TaskError::TaskNotFound)?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let rows_affected = Task::delete(&state.db().db, task.id, user.id).await?;
    if rows_affected == 0 {
        return Err(TaskError::TaskNotFound.into());
    }

    tracing::debug!(task_id = %task.id, "Deleted task");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .route("/insights", post(insights::generate_insights))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}

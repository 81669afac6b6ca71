use axum::{
    Extension,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::models::{
    task::{Task, TaskError},
    user::User,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Resolves `{task_id}` against the caller's own tasks and stashes the result
/// as an extension. Another user's task id answers 404 here, identically to a
/// task that never existed.
pub async fn load_task_middleware(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(task) = Task::find_by_uuid_for_user(&state.db().db, task_id, user.id).await? else {
        tracing::warn!("Task {task_id} not found for user {}", user.id);
        return Err(TaskError::TaskNotFound.into());
    };

    request.extensions_mut().insert(task);
    Ok(next.run(request).await)
}

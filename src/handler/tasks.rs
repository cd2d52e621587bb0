use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{jobdtos::ApiResponse, taskdtos::*},
    error::HttpError,
    middleware::{freelancer_roles, role_check, JWTAuthMiddeware},
    models::taskmodel::{BurnoutWarning, Task},
    AppState,
};

pub fn tasks_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_task)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, freelancer_roles())
                }))
                .get(list_tasks),
        )
        .route("/burnout", get(get_burnout_report))
        .route("/:task_id", get(get_task))
        .route("/:task_id/status", put(update_task_status))
        .route("/:task_id/time-entry", post(add_time_entry))
        .route("/:task_id/progress", put(update_task_progress))
}

#[derive(Debug, Serialize)]
pub struct TimeEntryResponseDto {
    pub task: Task,
    pub burnout_warnings: Vec<BurnoutWarning>,
}

pub async fn create_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state.task_service.create_task(auth.user.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Task created successfully", task)),
    ))
}

pub async fn list_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<TasksQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let tasks = app_state.task_service.list_tasks(&auth.user, query).await?;
    Ok(Json(ApiResponse::success("Tasks retrieved successfully", tasks)))
}

pub async fn get_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state.task_service.get_task(task_id, &auth.user).await?;
    Ok(Json(ApiResponse::success("Task retrieved successfully", task)))
}

pub async fn update_task_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state
        .task_service
        .update_status(task_id, &body.status, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Task status updated", task)))
}

pub async fn add_time_entry(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TimeEntryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (task, burnout_warnings) = app_state
        .task_service
        .add_time_entry(task_id, auth.user.id, body)
        .await?;

    let message = if burnout_warnings.is_empty() {
        "Time entry added"
    } else {
        "Time entry added; daily hours are above the recommended limit"
    };

    Ok(Json(ApiResponse::success(
        message,
        TimeEntryResponseDto { task, burnout_warnings },
    )))
}

pub async fn update_task_progress(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<ProgressDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state
        .task_service
        .update_progress(task_id, body.progress, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Task progress updated", task)))
}

pub async fn get_burnout_report(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let report = app_state.task_service.burnout_report(auth.user.id).await?;
    Ok(Json(ApiResponse::success("Burnout report generated", report)))
}

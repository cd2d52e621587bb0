use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::jobdtos::*,
    error::HttpError,
    middleware::{admin_roles, client_roles, freelancer_roles, role_check, JWTAuthMiddeware},
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_job)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, client_roles())
                }))
                .get(list_jobs),
        )
        .route("/mine", get(get_my_jobs))
        .route("/:job_id", get(get_job).delete(delete_job))
        .route("/:job_id/status", put(update_job_status))
        .route("/:job_id/proposals", get(get_proposals))
        .route(
            "/:job_id/proposal",
            post(submit_proposal).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, freelancer_roles())
            })),
        )
        .route("/:job_id/proposal/:proposal_id/accept", post(accept_proposal))
        .route("/:job_id/proposal/:proposal_id/reject", post(reject_proposal))
        .route("/:job_id/milestone/:milestone_id/submit", post(submit_milestone))
        .route(
            "/:job_id/milestone/:milestone_id/approve",
            post(approve_milestone).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, admin_roles())
            })),
        )
        .route(
            "/:job_id/milestone/:milestone_id/reject",
            post(reject_milestone).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, admin_roles())
            })),
        )
        .route(
            "/:job_id/admin-approval",
            post(set_admin_approval).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, admin_roles())
            })),
        )
        .route("/:job_id/tasks/reconcile", post(reconcile_tasks))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state.job_service.create_job(auth.user.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Job created successfully", job)),
    ))
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = app_state.job_service.list_public_jobs(query).await?;
    Ok(Json(page))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.get_user_jobs(auth.user.id).await?;
    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.get_job(job_id).await?;
    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

pub async fn delete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.job_service.delete_job(job_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Job deleted successfully", job_id)))
}

pub async fn update_job_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .update_job_status(job_id, body.status, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Job status updated", job)))
}

pub async fn get_proposals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let proposals = app_state.job_service.get_proposals(job_id, &auth.user).await?;
    Ok(Json(ApiResponse::success("Proposals retrieved successfully", proposals)))
}

pub async fn submit_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SubmitProposalDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let proposal = app_state
        .job_service
        .submit_proposal(job_id, &auth.user, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Proposal submitted successfully", proposal)),
    ))
}

pub async fn accept_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((job_id, proposal_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .job_service
        .accept_proposal(job_id, proposal_id, auth.user.id)
        .await?;

    let message = if outcome.side_effects.iter().all(|effect| effect.succeeded) {
        "Proposal accepted successfully"
    } else {
        "Proposal accepted; some follow-up actions failed"
    };

    Ok(Json(ApiResponse::success(message, outcome)))
}

pub async fn reject_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((job_id, proposal_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let proposal = app_state
        .job_service
        .reject_proposal(job_id, proposal_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Proposal rejected", proposal)))
}

pub async fn submit_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((job_id, milestone_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MilestoneSubmitDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let milestone = app_state
        .job_service
        .submit_milestone(job_id, milestone_id, auth.user.id, body)
        .await?;

    Ok(Json(ApiResponse::success("Milestone submitted for review", milestone)))
}

pub async fn approve_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Path((job_id, milestone_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<AdminNotesDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .approve_milestone(job_id, milestone_id, body.admin_notes)
        .await?;

    Ok(Json(ApiResponse::success("Milestone approved", job)))
}

pub async fn reject_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Path((job_id, milestone_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<AdminNotesDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .reject_milestone(job_id, milestone_id, body.admin_notes)
        .await?;

    Ok(Json(ApiResponse::success("Milestone sent back for revision", job)))
}

pub async fn set_admin_approval(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<AdminApprovalDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .set_admin_approval(job_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success("Job approval updated", job)))
}

pub async fn reconcile_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let report = app_state
        .job_service
        .reconcile_tasks(job_id, &auth.user)
        .await?;

    Ok(Json(ApiResponse::success("Job tasks reconciled", report)))
}

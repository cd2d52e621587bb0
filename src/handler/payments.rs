use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{jobdtos::ApiResponse, paymentdtos::*, userdtos::LedgerResponseDto},
    error::HttpError,
    middleware::{admin_roles, client_roles, freelancer_roles, role_check, JWTAuthMiddeware},
    AppState,
};

pub fn payments_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_payment)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, client_roles())
                }))
                .get(list_payments),
        )
        .route(
            "/release-request",
            post(create_release_request).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, client_roles())
            })),
        )
        .route("/refund", post(refund_payment))
        .route(
            "/earnings",
            get(get_earnings).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, freelancer_roles())
            })),
        )
        .route(
            "/withdraw",
            post(withdraw_earnings).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, freelancer_roles())
            })),
        )
        .route(
            "/milestone/:job_id/:milestone_id/release",
            post(release_milestone_payment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, admin_roles())
            })),
        )
        .route("/:payment_id", get(get_payment))
        .route("/:payment_id/release", post(release_payment))
        .route("/:payment_id/cancel", post(cancel_payment))
}

pub async fn create_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment = app_state.escrow_service.create_payment(auth.user.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Payment placed in escrow", payment)),
    ))
}

pub async fn list_payments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state.escrow_service.list_payments(auth.user.id).await?;
    Ok(Json(ApiResponse::success("Payments retrieved successfully", payments)))
}

pub async fn create_release_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReleaseRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment = app_state
        .escrow_service
        .create_release_request(auth.user.id, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Release request created", payment)),
    ))
}

pub async fn get_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state.escrow_service.get_payment(payment_id, &auth.user).await?;
    Ok(Json(ApiResponse::success("Payment retrieved successfully", payment)))
}

pub async fn release_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .escrow_service
        .release_payment(payment_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Payment released", payment)))
}

pub async fn release_milestone_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((job_id, milestone_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .escrow_service
        .release_milestone_payment(job_id, milestone_id, auth.user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Milestone payment released", payment)),
    ))
}

pub async fn refund_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RefundDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment = app_state.escrow_service.refund_payment(auth.user.id, body).await?;
    Ok(Json(ApiResponse::success("Payment refunded", payment)))
}

pub async fn cancel_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .escrow_service
        .cancel_payment(payment_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Payment cancelled", payment)))
}

pub async fn get_earnings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let earnings = app_state.escrow_service.get_earnings(auth.user.id).await?;
    Ok(Json(ApiResponse::success("Earnings retrieved successfully", earnings)))
}

pub async fn withdraw_earnings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<WithdrawDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ledger = app_state.escrow_service.withdraw(auth.user.id, body).await?;
    Ok(Json(ApiResponse::success(
        "Withdrawal successful",
        LedgerResponseDto::from(&ledger),
    )))
}

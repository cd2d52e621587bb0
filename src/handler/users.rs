use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::{
        jobdtos::ApiResponse,
        userdtos::{FilterUserDto, LedgerResponseDto, UserData, UserResponseDto},
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/ledger", get(get_my_ledger))
}

pub async fn get_me(
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let response = UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&auth.user),
        },
    };

    Ok(Json(response))
}

pub async fn get_my_ledger(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let ledger = app_state.escrow_service.get_ledger(auth.user.id).await?;
    Ok(Json(ApiResponse::success(
        "Ledger retrieved successfully",
        LedgerResponseDto::from(&ledger),
    )))
}

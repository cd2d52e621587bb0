use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{chatdtos::*, jobdtos::ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/", get(get_conversations).post(create_conversation))
        .route("/:conversation_id", get(get_conversation))
}

pub async fn create_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateConversationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let conversation = app_state
        .chat_service
        .get_or_create_conversation(auth.user.id, body.participant_id, body.job_id)
        .await?;

    Ok(Json(ApiResponse::success("Conversation ready", conversation)))
}

pub async fn get_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<ConversationsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(1).max(1) as i64;
    let limit = query.limit.unwrap_or(20) as i64;

    let conversations = app_state
        .chat_service
        .get_user_conversations(auth.user.id, limit, (page - 1) * limit)
        .await?;

    Ok(Json(ApiResponse::success("Conversations retrieved successfully", conversations)))
}

pub async fn get_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let conversation = app_state
        .chat_service
        .get_conversation(&conversation_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Conversation retrieved successfully", conversation)))
}

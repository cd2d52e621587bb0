use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        chat::chat_handler, jobs::jobs_handler, payments::payments_handler,
        tasks::tasks_handler, users::users_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/jobs", jobs_handler())
        .nest("/tasks", tasks_handler())
        .nest("/payments", payments_handler())
        .nest("/chats", chat_handler())
        .nest("/users", users_handler())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(app_state))
                .layer(middleware::from_fn(auth)),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}

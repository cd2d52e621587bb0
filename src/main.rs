mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use crate::models::taskmodel::TaskDefaults;
use service::{
    acceptance_hooks::{AcceptanceHook, ConversationHook},
    chat_service::ChatService,
    escrow_service::EscrowService,
    job_service::JobService,
    task_service::TaskService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub job_service: Arc<JobService>,
    pub task_service: Arc<TaskService>,
    pub escrow_service: Arc<EscrowService>,
    pub chat_service: Arc<ChatService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let task_defaults = TaskDefaults {
            hours: config.default_task_hours,
            deadline_days: config.default_task_deadline_days,
        };

        let chat_service = Arc::new(ChatService::new(db_client_arc.clone()));
        let escrow_service = Arc::new(EscrowService::new(db_client_arc.clone()));
        let task_service = Arc::new(TaskService::new(
            db_client_arc.clone(),
            task_defaults,
            config.daily_hours_threshold,
        ));

        let hooks: Vec<Arc<dyn AcceptanceHook>> =
            vec![Arc::new(ConversationHook::new(chat_service.clone()))];
        let job_service = Arc::new(JobService::new(db_client_arc.clone(), hooks, task_defaults));

        Self {
            env: config,
            db_client: db_client_arc,
            job_service,
            task_service,
            escrow_service,
            chat_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!(
                "✅ Connection to the database is successful! (max connections: {})",
                config.database_max_connections
            );
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let allowed_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(DBClient::new(pool), config.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", err);
    }
}

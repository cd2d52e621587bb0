// config.rs
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub database_max_connections: u32,
    pub cors_allowed_origins: Vec<String>,
    // Task fan-out fallbacks
    pub default_task_hours: f64,
    pub default_task_deadline_days: i64,
    // Burnout warnings are advisory only
    pub daily_hours_threshold: f64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: parse_or("JWT_MAXAGE", Some(jwt_maxage), 60),
            port: env_or("PORT", 8000),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            cors_allowed_origins,
            default_task_hours: env_or("DEFAULT_TASK_HOURS", 8.0),
            default_task_deadline_days: env_or("DEFAULT_TASK_DEADLINE_DAYS", 30),
            daily_hours_threshold: env_or("DAILY_HOURS_THRESHOLD", 8.0),
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => value.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("⚠️ {} has invalid value {:?}, using {:?}", key, value, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or("PORT", Some("not-a-port".to_string()), 8000u16), 8000);
        assert_eq!(parse_or("PORT", Some(" 9090 ".to_string()), 8000u16), 9090);
        assert_eq!(parse_or::<f64>("DAILY_HOURS_THRESHOLD", None, 8.0), 8.0);
    }
}

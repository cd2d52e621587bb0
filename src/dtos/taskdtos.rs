use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::taskmodel::BurnoutWarning;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateTaskStatusDto {
    /// Parsed server-side so unknown values surface as an invalid state.
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TimeEntryDto {
    #[validate(range(min = 0.01, message = "Hours must be positive"))]
    pub hours: f64,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: String,

    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProgressDto {
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTaskDto {
    pub job_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub milestone: Option<String>,

    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0.0, message = "Estimated budget cannot be negative"))]
    pub estimated_budget: Option<f64>,

    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskViewRole {
    Freelancer,
    Client,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksQuery {
    pub role: Option<TaskViewRole>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BurnoutResponseDto {
    pub threshold: f64,
    pub warnings: Vec<BurnoutWarning>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{jobmodel::*, taskmodel::Task},
    service::error::ServiceError,
    utils::decimal::money_from_f64,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub status: String,
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = ((total as f64) / (limit.max(1) as f64)).ceil() as u32;
        Self {
            status: "success".to_string(),
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateMilestoneDto {
    #[validate(length(min = 1, max = 200, message = "Milestone title must be between 1 and 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Milestone description must be at most 2000 characters"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Milestone payment cannot be negative"))]
    pub payment: f64,

    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[serde(default)]
    pub required_skills: Vec<String>,

    #[validate(length(min = 1, message = "Experience level is required"))]
    pub experience_level: String,

    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub total_budget: f64,

    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,

    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub visibility: JobVisibility,

    #[serde(default)]
    #[validate]
    pub milestones: Vec<CreateMilestoneDto>,
}

impl CreateJobDto {
    pub fn into_new_job(self) -> Result<NewJob, ServiceError> {
        let milestones = self
            .milestones
            .into_iter()
            .map(|m| {
                Ok(NewMilestone {
                    title: m.title,
                    description: m.description,
                    payment: money_from_f64(m.payment, "milestone payment")?,
                    due_date: m.due_date,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok(NewJob {
            title: self.title,
            description: self.description,
            category: self.category,
            required_skills: self.required_skills,
            experience_level: self.experience_level,
            total_budget: money_from_f64(self.total_budget, "total_budget")?,
            estimated_hours: self.estimated_hours,
            deadline: self.deadline,
            visibility: self.visibility,
            milestones,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitProposalDto {
    #[validate(range(min = 0.0, message = "Proposed rate cannot be negative"))]
    pub proposed_rate: f64,

    #[validate(length(min = 1, max = 5000, message = "Message must be between 1 and 5000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MilestoneSubmitDto {
    #[validate(length(min = 1, message = "Submitted work is required"))]
    pub submitted_work: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct AdminNotesDto {
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateJobStatusDto {
    pub status: JobStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminApprovalDto {
    pub status: AdminApprovalStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct JobsQuery {
    pub category: Option<String>,
    pub status: Option<JobStatus>,

    #[validate(range(min = 1, message = "Page starts at 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

/// What a caller learns from an acceptance: the committed job, the tasks
/// created with it, and the outcome of each post-commit side effect.
#[derive(Debug, Serialize)]
pub struct AcceptanceResponseDto {
    pub job: Job,
    pub tasks: Vec<Task>,
    pub conversation_id: Option<String>,
    pub side_effects: Vec<SideEffectDto>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SideEffectDto {
    pub name: String,
    pub succeeded: bool,
    pub reference: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponseDto {
    pub job_id: Uuid,
    pub existing: usize,
    pub created: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::BigDecimal;

    fn dto() -> CreateJobDto {
        CreateJobDto {
            title: "Landing page".to_string(),
            description: "Marketing site rebuild".to_string(),
            category: "web".to_string(),
            required_skills: vec!["rust".to_string()],
            experience_level: "intermediate".to_string(),
            total_budget: 250.0,
            estimated_hours: Some(20.0),
            deadline: None,
            visibility: JobVisibility::Public,
            milestones: vec![
                CreateMilestoneDto {
                    title: "Design".to_string(),
                    description: String::new(),
                    payment: 100.0,
                    due_date: None,
                },
                CreateMilestoneDto {
                    title: "Build".to_string(),
                    description: String::new(),
                    payment: 150.0,
                    due_date: None,
                },
            ],
        }
    }

    #[test]
    fn create_job_dto_validates_and_converts() {
        let body = dto();
        assert!(body.validate().is_ok());

        let new_job = body.into_new_job().unwrap();
        assert_eq!(new_job.total_budget, BigDecimal::from(250));
        assert_eq!(new_job.milestones.len(), 2);
        assert_eq!(new_job.milestones[1].payment, BigDecimal::from(150));
    }

    #[test]
    fn negative_milestone_payment_fails_validation() {
        let mut body = dto();
        body.milestones[0].payment = -1.0;
        assert!(body.validate().is_err());
    }

    #[test]
    fn paginated_response_rounds_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 21, 1, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.status, "success");
    }
}

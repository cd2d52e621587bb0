// service/task_service.rs
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use num_traits::Zero;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt, taskdb::TaskExt},
    dtos::taskdtos::*,
    models::{taskmodel::*, usermodel::User},
    service::error::ServiceError,
    utils::decimal::money_from_f64,
};

#[derive(Debug, Clone)]
pub struct TaskService {
    db_client: Arc<DBClient>,
    defaults: TaskDefaults,
    daily_hours_threshold: f64,
}

impl TaskService {
    pub fn new(db_client: Arc<DBClient>, defaults: TaskDefaults, daily_hours_threshold: f64) -> Self {
        Self {
            db_client,
            defaults,
            daily_hours_threshold,
        }
    }

    /// Extra task added by the assigned freelancer outside the acceptance fan-out.
    pub async fn create_task(&self, freelancer_id: Uuid, body: CreateTaskDto) -> Result<Task, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(body.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(body.job_id))?;

        if !job.is_assignee(freelancer_id) {
            return Err(ServiceError::forbidden(
                freelancer_id,
                format!("add tasks to job {}", job.id),
            ));
        }

        let now = Utc::now();
        let estimated_budget = match body.estimated_budget {
            Some(amount) => money_from_f64(amount, "estimated_budget")?,
            None => BigDecimal::zero(),
        };

        let plan = NewTask {
            job_id: job.id,
            freelancer_id,
            client_id: job.client_id,
            title: body.title,
            description: body.description,
            milestone: body.milestone,
            status: TaskStatus::Todo,
            estimated_hours: body.estimated_hours.unwrap_or(self.defaults.hours),
            estimated_budget,
            deadline: body
                .deadline
                .or(job.deadline)
                .unwrap_or_else(|| now + Duration::days(self.defaults.deadline_days)),
            client_approved: false,
        };

        let mut tx = self.db_client.begin().await?;
        let task = self.db_client.insert_task_tx(&plan, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(task_id = %task.id, job_id = %job.id, "task created");
        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid, user: &User) -> Result<Task, ServiceError> {
        let task = self
            .db_client
            .get_task_by_id(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if task.freelancer_id != user.id && task.client_id != user.id && !user.role.is_admin() {
            return Err(ServiceError::forbidden(user.id, format!("view task {}", task_id)));
        }
        Ok(task)
    }

    pub async fn list_tasks(&self, user: &User, query: TasksQuery) -> Result<Vec<Task>, ServiceError> {
        if let Some(job_id) = query.job_id {
            let job = self
                .db_client
                .get_job_by_id(job_id)
                .await?
                .ok_or(ServiceError::JobNotFound(job_id))?;

            if !job.is_party(user.id) && !user.role.is_admin() {
                return Err(ServiceError::forbidden(user.id, format!("view tasks of job {}", job_id)));
            }
            return Ok(self.db_client.get_job_tasks(job_id).await?);
        }

        let tasks = match query.role.unwrap_or(TaskViewRole::Freelancer) {
            TaskViewRole::Freelancer => self.db_client.get_freelancer_tasks(user.id).await?,
            TaskViewRole::Client => self.db_client.get_client_tasks(user.id).await?,
        };
        Ok(tasks)
    }

    pub async fn update_status(
        &self,
        task_id: Uuid,
        status: &str,
        user_id: Uuid,
    ) -> Result<Task, ServiceError> {
        let status = TaskStatus::from_str(status)?;

        let mut tx = self.db_client.begin().await?;
        let mut task = self
            .db_client
            .lock_task_tx(task_id, &mut tx)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        let previous = task.status;
        task.set_status(status, user_id, Utc::now())?;
        let task = self.db_client.save_task_tx(&task, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(
            task_id = %task_id,
            from = previous.to_str(),
            to = status.to_str(),
            "task status changed"
        );
        Ok(task)
    }

    /// Logs hours against the task. Burnout warnings for the entry's day are
    /// returned alongside but never block the write.
    pub async fn add_time_entry(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        body: TimeEntryDto,
    ) -> Result<(Task, Vec<BurnoutWarning>), ServiceError> {
        let now = Utc::now();
        let entry = TimeEntry {
            date: body.date.unwrap_or(now),
            hours: body.hours,
            description: body.description,
        };
        let day = entry.date.date_naive();

        let mut tx = self.db_client.begin().await?;
        let mut task = self
            .db_client
            .lock_task_tx(task_id, &mut tx)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        task.add_time_entry(entry, user_id, now)?;
        let task = self.db_client.save_task_tx(&task, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(task_id = %task_id, actual_hours = task.actual_hours, "time entry added");

        let tasks = self.db_client.get_freelancer_tasks(user_id).await?;
        let warnings: Vec<BurnoutWarning> = burnout_warnings(&tasks, self.daily_hours_threshold)
            .into_iter()
            .filter(|w| w.date == day)
            .collect();

        for warning in &warnings {
            tracing::warn!(
                freelancer_id = %user_id,
                date = %warning.date,
                hours = warning.total_hours,
                "daily hours above threshold"
            );
        }

        Ok((task, warnings))
    }

    pub async fn update_progress(
        &self,
        task_id: Uuid,
        progress: i32,
        user_id: Uuid,
    ) -> Result<Task, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut task = self
            .db_client
            .lock_task_tx(task_id, &mut tx)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        task.set_progress(progress, user_id, Utc::now())?;
        let task = self.db_client.save_task_tx(&task, &mut tx).await?;
        tx.commit().await?;

        tracing::debug!(task_id = %task_id, progress, "task progress updated");
        Ok(task)
    }

    pub async fn burnout_report(&self, freelancer_id: Uuid) -> Result<BurnoutResponseDto, ServiceError> {
        let tasks = self.db_client.get_freelancer_tasks(freelancer_id).await?;

        Ok(BurnoutResponseDto {
            threshold: self.daily_hours_threshold,
            warnings: burnout_warnings(&tasks, self.daily_hours_threshold),
        })
    }
}

// db/taskdb.rs
use async_trait::async_trait;
use sqlx::{types::Json, Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::taskmodel::*;

#[async_trait]
pub trait TaskExt {
    async fn insert_task_tx(
        &self,
        task: &NewTask,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Task, Error>;

    async fn get_task_by_id(&self, task_id: Uuid) -> Result<Option<Task>, Error>;

    async fn lock_task_tx(
        &self,
        task_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Task>, Error>;

    async fn save_task_tx(
        &self,
        task: &Task,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Task, Error>;

    async fn get_job_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, Error>;

    async fn get_job_tasks_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Task>, Error>;

    async fn get_freelancer_tasks(&self, freelancer_id: Uuid) -> Result<Vec<Task>, Error>;

    async fn get_client_tasks(&self, client_id: Uuid) -> Result<Vec<Task>, Error>;
}

#[async_trait]
impl TaskExt for DBClient {
    async fn insert_task_tx(
        &self,
        task: &NewTask,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Task, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks
            (job_id, freelancer_id, client_id, title, description, milestone, status,
            estimated_hours, estimated_budget, deadline, client_approved, time_entries)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#
        )
        .bind(task.job_id)
        .bind(task.freelancer_id)
        .bind(task.client_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.milestone)
        .bind(task.status)
        .bind(task.estimated_hours)
        .bind(&task.estimated_budget)
        .bind(task.deadline)
        .bind(task.client_approved)
        .bind(Json(Vec::<TimeEntry>::new()))
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_task_by_id(&self, task_id: Uuid) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE id = $1
            "#
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn lock_task_tx(
        &self,
        task_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn save_task_tx(
        &self,
        task: &Task,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Task, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2,
                progress = $3,
                actual_hours = $4,
                time_entries = $5,
                completed_at = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(task.id)
        .bind(task.status)
        .bind(task.progress)
        .bind(task.actual_hours)
        .bind(&task.time_entries)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_job_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE job_id = $1
            ORDER BY seq ASC
            "#
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_job_tasks_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE job_id = $1
            ORDER BY seq ASC
            "#
        )
        .bind(job_id)
        .fetch_all(&mut **tx)
        .await
    }

    async fn get_freelancer_tasks(&self, freelancer_id: Uuid) -> Result<Vec<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE freelancer_id = $1
            ORDER BY deadline ASC, created_at ASC
            "#
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_client_tasks(&self, client_id: Uuid) -> Result<Vec<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE client_id = $1
            ORDER BY deadline ASC, created_at ASC
            "#
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }
}

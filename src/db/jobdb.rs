// db/jobdb.rs
use async_trait::async_trait;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

#[async_trait]
pub trait JobExt {
    async fn insert_job(&self, job: &Job) -> Result<Job, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    /// Row-locks the job for the rest of the transaction.
    async fn lock_job_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Job>, Error>;

    /// Writes the whole aggregate back, milestones and proposals included.
    async fn save_job_tx(
        &self,
        job: &Job,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Job, Error>;

    async fn delete_job_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), Error>;

    async fn get_public_jobs(
        &self,
        category: Option<String>,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error>;

    async fn count_public_jobs(
        &self,
        category: Option<String>,
        status: Option<JobStatus>,
    ) -> Result<i64, Error>;

    async fn get_user_jobs(&self, user_id: Uuid) -> Result<Vec<Job>, Error>;

    async fn set_admin_approval(
        &self,
        job_id: Uuid,
        status: AdminApprovalStatus,
    ) -> Result<Option<Job>, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn insert_job(&self, job: &Job) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
            (id, client_id, title, description, category, required_skills, experience_level,
            total_budget, total_milestone_price, estimated_hours, deadline, status, payment_status,
            admin_approval_status, amount_paid, visibility, milestones, proposals,
            created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING *
            "#
        )
        .bind(job.id)
        .bind(job.client_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.category)
        .bind(&job.required_skills)
        .bind(&job.experience_level)
        .bind(&job.total_budget)
        .bind(&job.total_milestone_price)
        .bind(job.estimated_hours)
        .bind(job.deadline)
        .bind(job.status)
        .bind(job.payment_status)
        .bind(job.admin_approval_status)
        .bind(&job.amount_paid)
        .bind(job.visibility)
        .bind(&job.milestones)
        .bind(&job.proposals)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE id = $1
            "#
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn lock_job_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn save_job_tx(
        &self,
        job: &Job,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = $2,
                payment_status = $3,
                admin_approval_status = $4,
                amount_paid = $5,
                milestones = $6,
                proposals = $7,
                assigned_to = $8,
                assigned_at = $9,
                accepted_proposal_id = $10,
                updated_at = $11
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(job.id)
        .bind(job.status)
        .bind(job.payment_status)
        .bind(job.admin_approval_status)
        .bind(&job.amount_paid)
        .bind(&job.milestones)
        .bind(&job.proposals)
        .bind(job.assigned_to)
        .bind(job.assigned_at)
        .bind(job.accepted_proposal_id)
        .bind(job.updated_at)
        .fetch_one(&mut **tx)
        .await
    }

    async fn delete_job_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = $1 AND assigned_to IS NULL
            "#
        )
        .bind(job_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn get_public_jobs(
        &self,
        category: Option<String>,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE visibility = 'public'::job_visibility
              AND ($1::text IS NULL OR category = $1)
              AND status = COALESCE($2, 'open'::job_status)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        )
        .bind(category)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_public_jobs(
        &self,
        category: Option<String>,
        status: Option<JobStatus>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE visibility = 'public'::job_visibility
              AND ($1::text IS NULL OR category = $1)
              AND status = COALESCE($2, 'open'::job_status)
            "#
        )
        .bind(category)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_jobs(&self, user_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE client_id = $1 OR assigned_to = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_admin_approval(
        &self,
        job_id: Uuid,
        status: AdminApprovalStatus,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET admin_approval_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(job_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }
}

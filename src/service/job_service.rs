// service/job_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt, paymentdb::PaymentExt, taskdb::TaskExt, userdb::UserExt},
    dtos::jobdtos::*,
    models::{
        jobmodel::*,
        taskmodel::{estimated_budget_total, missing_tasks, plan_tasks_for_acceptance, TaskDefaults},
        usermodel::User,
    },
    service::{
        acceptance_hooks::{run_acceptance_hooks, AcceptanceHook, AcceptedProposal, CONVERSATION_HOOK},
        error::ServiceError,
    },
    utils::decimal::money_from_f64,
};

#[derive(Clone)]
pub struct JobService {
    db_client: Arc<DBClient>,
    hooks: Vec<Arc<dyn AcceptanceHook>>,
    task_defaults: TaskDefaults,
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("db_client", &self.db_client)
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("task_defaults", &self.task_defaults)
            .finish()
    }
}

impl JobService {
    pub fn new(
        db_client: Arc<DBClient>,
        hooks: Vec<Arc<dyn AcceptanceHook>>,
        task_defaults: TaskDefaults,
    ) -> Self {
        Self {
            db_client,
            hooks,
            task_defaults,
        }
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn create_job(&self, client_id: Uuid, body: CreateJobDto) -> Result<Job, ServiceError> {
        let client = self
            .db_client
            .get_user(client_id)
            .await?
            .ok_or(ServiceError::UserNotFound(client_id))?;

        if !client.role.can_post_jobs() {
            return Err(ServiceError::forbidden(client_id, "post jobs"));
        }

        let job = Job::new(client_id, body.into_new_job()?, Utc::now());
        let job = self.db_client.insert_job(&job).await?;

        tracing::info!(
            job_id = %job.id,
            client_id = %client_id,
            milestones = job.milestones.0.len(),
            "job created"
        );
        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.load_job(job_id).await
    }

    pub async fn list_public_jobs(
        &self,
        query: JobsQuery,
    ) -> Result<PaginatedResponse<Job>, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = ((page - 1) * limit) as i64;

        let jobs = self
            .db_client
            .get_public_jobs(query.category.clone(), query.status, limit as i64, offset)
            .await?;
        let total = self
            .db_client
            .count_public_jobs(query.category, query.status)
            .await?;

        Ok(PaginatedResponse::new(jobs, total, page, limit))
    }

    pub async fn get_user_jobs(&self, user_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        Ok(self.db_client.get_user_jobs(user_id).await?)
    }

    /// The client and admins see every proposal, anyone else only their own.
    pub async fn get_proposals(&self, job_id: Uuid, user: &User) -> Result<Vec<Proposal>, ServiceError> {
        let job = self.load_job(job_id).await?;

        if job.is_client(user.id) || user.role.is_admin() {
            return Ok(job.proposals.0);
        }

        Ok(job
            .proposals
            .0
            .into_iter()
            .filter(|p| p.freelancer_id == user.id)
            .collect())
    }

    pub async fn submit_proposal(
        &self,
        job_id: Uuid,
        freelancer: &User,
        body: SubmitProposalDto,
    ) -> Result<Proposal, ServiceError> {
        if !freelancer.role.can_bid() {
            return Err(ServiceError::forbidden(freelancer.id, "submit proposals"));
        }
        let rate = money_from_f64(body.proposed_rate, "proposed_rate")?;

        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let proposal = job.submit_proposal(freelancer.id, rate, body.message, Utc::now())?;
        self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(
            job_id = %job_id,
            proposal_id = %proposal.id,
            freelancer_id = %freelancer.id,
            "proposal submitted"
        );
        Ok(proposal)
    }

    /// Flips the job to `in_progress` and creates its tasks in one transaction,
    /// then runs the post-commit hooks.
    pub async fn accept_proposal(
        &self,
        job_id: Uuid,
        proposal_id: Uuid,
        client_id: Uuid,
    ) -> Result<AcceptanceResponseDto, ServiceError> {
        let now = Utc::now();
        let mut tx = self.db_client.begin().await?;

        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let accepted = job.accept_proposal(proposal_id, client_id, now)?;
        let job = self.db_client.save_job_tx(&job, &mut tx).await?;

        let mut tasks = Vec::new();
        let plans = plan_tasks_for_acceptance(&job, accepted.freelancer_id, self.task_defaults, now);
        let task_budget = estimated_budget_total(&plans);
        for plan in &plans {
            tasks.push(self.db_client.insert_task_tx(plan, &mut tx).await?);
        }

        tx.commit().await?;

        tracing::info!(
            job_id = %job_id,
            proposal_id = %proposal_id,
            freelancer_id = %accepted.freelancer_id,
            tasks = tasks.len(),
            task_budget = %task_budget,
            "proposal accepted"
        );

        let side_effects = run_acceptance_hooks(
            &self.hooks,
            &AcceptedProposal {
                job: job.clone(),
                proposal: accepted,
            },
        )
        .await;

        let conversation_id = side_effects
            .iter()
            .find(|effect| effect.name == CONVERSATION_HOOK)
            .and_then(|effect| effect.reference.clone());

        Ok(AcceptanceResponseDto {
            job,
            tasks,
            conversation_id,
            side_effects,
        })
    }

    pub async fn reject_proposal(
        &self,
        job_id: Uuid,
        proposal_id: Uuid,
        client_id: Uuid,
    ) -> Result<Proposal, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let proposal = job.reject_proposal(proposal_id, client_id, Utc::now())?;
        self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job_id, proposal_id = %proposal_id, "proposal rejected");
        Ok(proposal)
    }

    pub async fn submit_milestone(
        &self,
        job_id: Uuid,
        milestone_id: Uuid,
        freelancer_id: Uuid,
        body: MilestoneSubmitDto,
    ) -> Result<Milestone, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let milestone = job.submit_milestone(milestone_id, freelancer_id, body.submitted_work, Utc::now())?;
        self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job_id, milestone_id = %milestone_id, "milestone submitted");
        Ok(milestone)
    }

    pub async fn approve_milestone(
        &self,
        job_id: Uuid,
        milestone_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        job.approve_milestone(milestone_id, admin_notes, Utc::now())?;
        let job = self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(
            job_id = %job_id,
            milestone_id = %milestone_id,
            payment_status = ?job.payment_status,
            "milestone approved"
        );
        Ok(job)
    }

    pub async fn reject_milestone(
        &self,
        job_id: Uuid,
        milestone_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        job.reject_milestone(milestone_id, admin_notes, Utc::now())?;
        let job = self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job_id, milestone_id = %milestone_id, "milestone sent back for revision");
        Ok(job)
    }

    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        user_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let previous = job.status;
        job.update_status(status, user_id, Utc::now())?;
        let job = self.db_client.save_job_tx(&job, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job_id, from = ?previous, to = ?status, "job status changed");
        Ok(job)
    }

    pub async fn delete_job(&self, job_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let payments = self.db_client.count_job_payments_tx(job_id, &mut tx).await?;
        job.ensure_deletable_by(user_id, payments)?;
        self.db_client.delete_job_tx(job_id, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job_id, "job deleted");
        Ok(())
    }

    pub async fn set_admin_approval(
        &self,
        job_id: Uuid,
        status: AdminApprovalStatus,
    ) -> Result<Job, ServiceError> {
        let job = self
            .db_client
            .set_admin_approval(job_id, status)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        tracing::info!(job_id = %job_id, status = ?status, "job admin approval updated");
        Ok(job)
    }

    /// Recreates tasks that an acceptance should have produced but that are
    /// missing for the job.
    pub async fn reconcile_tasks(
        &self,
        job_id: Uuid,
        user: &User,
    ) -> Result<ReconcileResponseDto, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if !job.is_party(user.id) && !user.role.is_admin() {
            return Err(ServiceError::forbidden(user.id, format!("reconcile tasks for job {}", job_id)));
        }

        let freelancer_id = job.assigned_to.ok_or_else(|| {
            ServiceError::invalid_state(format!("job {} has no accepted proposal", job_id))
        })?;

        let existing = self.db_client.get_job_tasks_tx(job_id, &mut tx).await?;
        let mut created = Vec::new();
        for plan in missing_tasks(&job, freelancer_id, &existing, self.task_defaults, Utc::now()) {
            created.push(self.db_client.insert_task_tx(&plan, &mut tx).await?);
        }
        tx.commit().await?;

        if !created.is_empty() {
            tracing::warn!(job_id = %job_id, created = created.len(), "reconciled missing tasks");
        }

        Ok(ReconcileResponseDto {
            job_id,
            existing: existing.len(),
            created,
        })
    }
}

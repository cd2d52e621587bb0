use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};
use uuid::Uuid;

use crate::service::error::ServiceError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobPaymentStatus {
    Pending,
    Escrow,
    Partial,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "admin_approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "job_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobVisibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Submitted,
    Approved,
    Completed,
    Rejected,
}

impl MilestoneStatus {
    /// Counts towards the job's aggregate payment status.
    pub fn is_settled(&self) -> bool {
        matches!(self, MilestoneStatus::Approved | MilestoneStatus::Completed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Milestone {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub payment: BigDecimal,
    pub status: MilestoneStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_work: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Proposal {
    pub id: Uuid,
    pub freelancer_id: Uuid,
    pub proposed_rate: BigDecimal,
    pub message: String,
    pub status: ProposalStatus,
    pub submitted_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Job aggregate. Milestones and proposals live inside the job row and are
/// always written back together with it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub required_skills: Vec<String>,
    pub experience_level: String,
    pub total_budget: BigDecimal,
    pub total_milestone_price: BigDecimal,
    pub estimated_hours: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub payment_status: JobPaymentStatus,
    pub admin_approval_status: AdminApprovalStatus,
    pub amount_paid: BigDecimal,
    pub visibility: JobVisibility,
    pub milestones: Json<Vec<Milestone>>,
    pub proposals: Json<Vec<Proposal>>,
    pub assigned_to: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub accepted_proposal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub title: String,
    pub description: String,
    pub payment: BigDecimal,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: String,
    pub required_skills: Vec<String>,
    pub experience_level: String,
    pub total_budget: BigDecimal,
    pub estimated_hours: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub visibility: JobVisibility,
    pub milestones: Vec<NewMilestone>,
}

impl Job {
    pub fn new(client_id: Uuid, data: NewJob, now: DateTime<Utc>) -> Self {
        let milestones: Vec<Milestone> = data
            .milestones
            .into_iter()
            .map(|m| Milestone {
                id: Uuid::new_v4(),
                title: m.title,
                description: m.description,
                payment: m.payment,
                status: MilestoneStatus::Pending,
                due_date: m.due_date,
                submitted_at: None,
                approved_at: None,
                submitted_work: None,
                admin_notes: None,
            })
            .collect();

        let total_milestone_price = milestones.iter().map(|m| &m.payment).sum();

        Job {
            id: Uuid::new_v4(),
            client_id,
            title: data.title,
            description: data.description,
            category: data.category,
            required_skills: data.required_skills,
            experience_level: data.experience_level,
            total_budget: data.total_budget,
            total_milestone_price,
            estimated_hours: data.estimated_hours,
            deadline: data.deadline,
            status: JobStatus::Open,
            payment_status: JobPaymentStatus::Pending,
            admin_approval_status: AdminApprovalStatus::Pending,
            amount_paid: BigDecimal::zero(),
            visibility: data.visibility,
            milestones: Json(milestones),
            proposals: Json(Vec::new()),
            assigned_to: None,
            assigned_at: None,
            accepted_proposal_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_client(&self, user_id: Uuid) -> bool {
        self.client_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to == Some(user_id)
    }

    pub fn ensure_client(&self, user_id: Uuid, action: &str) -> Result<(), ServiceError> {
        if self.is_client(user_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(user_id, format!("{} on job {}", action, self.id)))
        }
    }

    pub fn proposal(&self, proposal_id: Uuid) -> Result<&Proposal, ServiceError> {
        self.proposals
            .0
            .iter()
            .find(|p| p.id == proposal_id)
            .ok_or(ServiceError::ProposalNotFound(proposal_id))
    }

    fn milestone_mut(&mut self, milestone_id: Uuid) -> Result<&mut Milestone, ServiceError> {
        self.milestones
            .0
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or(ServiceError::MilestoneNotFound(milestone_id))
    }

    pub fn proposal_by(&self, freelancer_id: Uuid) -> Option<&Proposal> {
        self.proposals.0.iter().find(|p| p.freelancer_id == freelancer_id)
    }

    pub fn submit_proposal(
        &mut self,
        freelancer_id: Uuid,
        proposed_rate: BigDecimal,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<Proposal, ServiceError> {
        if self.is_client(freelancer_id) {
            return Err(ServiceError::forbidden(
                freelancer_id,
                format!("bid on own job {}", self.id),
            ));
        }

        if self.proposal_by(freelancer_id).is_some() {
            return Err(ServiceError::DuplicateProposal {
                job_id: self.id,
                freelancer_id,
            });
        }

        if self.status != JobStatus::Open {
            return Err(ServiceError::invalid_state(format!(
                "job {} is not open for proposals",
                self.id
            )));
        }

        let proposal = Proposal {
            id: Uuid::new_v4(),
            freelancer_id,
            proposed_rate,
            message,
            status: ProposalStatus::Pending,
            submitted_at: now,
            accepted_at: None,
        };

        self.proposals.0.push(proposal.clone());
        self.updated_at = now;
        Ok(proposal)
    }

    /// Marks the proposal accepted and assigns its freelancer. Task fan-out and
    /// conversation creation are driven by the caller.
    pub fn accept_proposal(
        &mut self,
        proposal_id: Uuid,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Proposal, ServiceError> {
        self.ensure_client(client_id, "accept a proposal")?;

        if self.assigned_to.is_some() {
            return Err(ServiceError::invalid_state(format!(
                "job {} already has an accepted proposal",
                self.id
            )));
        }

        let job_id = self.id;
        let proposal = self
            .proposals
            .0
            .iter_mut()
            .find(|p| p.id == proposal_id)
            .ok_or(ServiceError::ProposalNotFound(proposal_id))?;

        if proposal.status != ProposalStatus::Pending {
            return Err(ServiceError::invalid_state(format!(
                "proposal {} on job {} is {:?}",
                proposal_id, job_id, proposal.status
            )));
        }

        proposal.status = ProposalStatus::Accepted;
        proposal.accepted_at = Some(now);
        let accepted = proposal.clone();

        self.assigned_to = Some(accepted.freelancer_id);
        self.assigned_at = Some(now);
        self.accepted_proposal_id = Some(accepted.id);
        self.status = JobStatus::InProgress;
        self.updated_at = now;

        Ok(accepted)
    }

    pub fn reject_proposal(
        &mut self,
        proposal_id: Uuid,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Proposal, ServiceError> {
        self.ensure_client(client_id, "reject a proposal")?;

        let proposal = self
            .proposals
            .0
            .iter_mut()
            .find(|p| p.id == proposal_id)
            .ok_or(ServiceError::ProposalNotFound(proposal_id))?;

        proposal.status = ProposalStatus::Rejected;
        let rejected = proposal.clone();
        self.updated_at = now;
        Ok(rejected)
    }

    pub fn submit_milestone(
        &mut self,
        milestone_id: Uuid,
        freelancer_id: Uuid,
        submitted_work: String,
        now: DateTime<Utc>,
    ) -> Result<Milestone, ServiceError> {
        if !self.is_assignee(freelancer_id) {
            return Err(ServiceError::forbidden(
                freelancer_id,
                format!("submit milestone {} on job {}", milestone_id, self.id),
            ));
        }

        let milestone = self.milestone_mut(milestone_id)?;
        if milestone.status.is_settled() {
            return Err(ServiceError::invalid_state(format!(
                "milestone {} is already {:?}",
                milestone_id, milestone.status
            )));
        }

        milestone.status = MilestoneStatus::Submitted;
        milestone.submitted_at = Some(now);
        milestone.submitted_work = Some(submitted_work);
        let submitted = milestone.clone();
        self.updated_at = now;
        Ok(submitted)
    }

    pub fn approve_milestone(
        &mut self,
        milestone_id: Uuid,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Milestone, ServiceError> {
        let milestone = self.milestone_mut(milestone_id)?;
        if milestone.status == MilestoneStatus::Completed {
            return Err(ServiceError::invalid_state(format!(
                "milestone {} has already been paid out",
                milestone_id
            )));
        }

        milestone.status = MilestoneStatus::Approved;
        milestone.approved_at = Some(now);
        if admin_notes.is_some() {
            milestone.admin_notes = admin_notes;
        }
        let approved = milestone.clone();

        self.recompute_payment_status();
        self.updated_at = now;
        Ok(approved)
    }

    pub fn reject_milestone(
        &mut self,
        milestone_id: Uuid,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Milestone, ServiceError> {
        // an approved milestone already counts towards the payment status
        let milestone = self.milestone_mut(milestone_id)?;
        if milestone.status.is_settled() {
            return Err(ServiceError::invalid_state(format!(
                "milestone {} is already {:?} and cannot be rejected",
                milestone_id, milestone.status
            )));
        }

        milestone.status = MilestoneStatus::Pending;
        milestone.submitted_work = None;
        milestone.submitted_at = None;
        milestone.admin_notes = Some(admin_notes.unwrap_or_else(|| "Needs revision".to_string()));
        let rejected = milestone.clone();
        self.updated_at = now;
        Ok(rejected)
    }

    /// Moves an approved milestone to completed and books its payment on the
    /// job. Returns the milestone and the freelancer to credit.
    pub fn complete_milestone_for_release(
        &mut self,
        milestone_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Milestone, Uuid), ServiceError> {
        let freelancer_id = self.assigned_to.ok_or_else(|| {
            ServiceError::invalid_state(format!("job {} has no assigned freelancer", self.id))
        })?;

        let milestone = self.milestone_mut(milestone_id)?;
        if milestone.status != MilestoneStatus::Approved {
            return Err(ServiceError::invalid_state(format!(
                "milestone {} must be approved before release, it is {:?}",
                milestone_id, milestone.status
            )));
        }

        milestone.status = MilestoneStatus::Completed;
        let completed = milestone.clone();

        self.amount_paid = &self.amount_paid + &completed.payment;
        self.recompute_payment_status();
        self.updated_at = now;
        Ok((completed, freelancer_id))
    }

    /// `completed` when every milestone is settled, `partial` when some are,
    /// otherwise untouched.
    pub fn recompute_payment_status(&mut self) {
        let milestones = &self.milestones.0;
        let settled = milestones.iter().filter(|m| m.status.is_settled()).count();

        if !milestones.is_empty() && settled == milestones.len() {
            self.payment_status = JobPaymentStatus::Completed;
        } else if settled > 0 {
            self.payment_status = JobPaymentStatus::Partial;
        }
    }

    pub fn update_status(
        &mut self,
        status: JobStatus,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if !self.is_client(user_id) && !self.is_assignee(user_id) {
            return Err(ServiceError::forbidden(
                user_id,
                format!("change the status of job {}", self.id),
            ));
        }

        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    /// `payments` is the number of payment rows recorded against the job.
    pub fn ensure_deletable_by(&self, user_id: Uuid, payments: i64) -> Result<(), ServiceError> {
        self.ensure_client(user_id, "delete")?;

        if self.assigned_to.is_some() {
            return Err(ServiceError::invalid_state(format!(
                "job {} has an assigned freelancer and cannot be deleted",
                self.id
            )));
        }
        if payments > 0 {
            return Err(ServiceError::invalid_state(format!(
                "job {} has {} recorded payment(s) and cannot be deleted",
                self.id, payments
            )));
        }
        Ok(())
    }

    /// Client or assignee.
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.is_client(user_id) || self.is_assignee(user_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    pub(crate) fn milestone(title: &str, payment: i32) -> NewMilestone {
        NewMilestone {
            title: title.to_string(),
            description: format!("{} deliverable", title),
            payment: BigDecimal::from(payment),
            due_date: None,
        }
    }

    pub(crate) fn job_with(client_id: Uuid, milestones: Vec<NewMilestone>) -> Job {
        Job::new(
            client_id,
            NewJob {
                title: "Landing page".to_string(),
                description: "Marketing site rebuild".to_string(),
                category: "web".to_string(),
                required_skills: vec!["rust".to_string(), "css".to_string()],
                experience_level: "intermediate".to_string(),
                total_budget: BigDecimal::from(250),
                estimated_hours: Some(20.0),
                deadline: None,
                visibility: JobVisibility::Public,
                milestones,
            },
            now(),
        )
    }

    #[test]
    fn new_job_sums_milestone_payments() {
        let job = job_with(Uuid::new_v4(), vec![milestone("Design", 100), milestone("Build", 150)]);

        assert_eq!(job.total_milestone_price, BigDecimal::from(250));
        assert_eq!(job.payment_status, JobPaymentStatus::Pending);
        assert_eq!(job.admin_approval_status, AdminApprovalStatus::Pending);
        assert_eq!(job.status, JobStatus::Open);
        assert_ne!(job.milestones.0[0].id, job.milestones.0[1].id);
        assert!(job.assigned_to.is_none());
    }

    #[test]
    fn second_proposal_from_same_freelancer_conflicts() {
        let mut job = job_with(Uuid::new_v4(), vec![]);
        let freelancer = Uuid::new_v4();

        let first = job
            .submit_proposal(freelancer, BigDecimal::from(200), "hire me".to_string(), now())
            .unwrap();
        let err = job
            .submit_proposal(freelancer, BigDecimal::from(90), "cheaper".to_string(), now())
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateProposal { .. }));
        assert_eq!(job.proposals.0.len(), 1);
        assert_eq!(job.proposals.0[0], first);
        assert_eq!(job.proposals.0[0].proposed_rate, BigDecimal::from(200));
    }

    #[test]
    fn client_cannot_bid_on_own_job() {
        let client = Uuid::new_v4();
        let mut job = job_with(client, vec![]);
        let err = job
            .submit_proposal(client, BigDecimal::from(10), "me".to_string(), now())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert!(job.proposals.0.is_empty());
    }

    #[test]
    fn accept_assigns_freelancer_and_starts_job() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = job_with(client, vec![milestone("Design", 100), milestone("Build", 150)]);
        let proposal = job
            .submit_proposal(freelancer, BigDecimal::from(200), "hi".to_string(), now())
            .unwrap();

        let accepted = job.accept_proposal(proposal.id, client, now()).unwrap();

        assert_eq!(accepted.status, ProposalStatus::Accepted);
        assert_eq!(accepted.accepted_at, Some(now()));
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.assigned_to, Some(freelancer));
        assert_eq!(job.assigned_at, Some(now()));
        assert_eq!(job.accepted_proposal_id, Some(proposal.id));
    }

    #[test]
    fn accept_by_stranger_is_forbidden_and_changes_nothing() {
        let mut job = job_with(Uuid::new_v4(), vec![]);
        let proposal = job
            .submit_proposal(Uuid::new_v4(), BigDecimal::from(50), "hi".to_string(), now())
            .unwrap();
        let before = job.clone();

        let err = job.accept_proposal(proposal.id, Uuid::new_v4(), now()).unwrap_err();

        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert_eq!(job.status, before.status);
        assert_eq!(job.proposals.0, before.proposals.0);
        assert!(job.assigned_to.is_none());
    }

    #[test]
    fn accept_unknown_proposal_is_not_found() {
        let client = Uuid::new_v4();
        let mut job = job_with(client, vec![]);
        let err = job.accept_proposal(Uuid::new_v4(), client, now()).unwrap_err();
        assert!(matches!(err, ServiceError::ProposalNotFound(_)));
    }

    #[test]
    fn only_first_acceptance_wins() {
        let client = Uuid::new_v4();
        let mut job = job_with(client, vec![]);
        let a = job
            .submit_proposal(Uuid::new_v4(), BigDecimal::from(50), "a".to_string(), now())
            .unwrap();
        let b = job
            .submit_proposal(Uuid::new_v4(), BigDecimal::from(60), "b".to_string(), now())
            .unwrap();

        job.accept_proposal(a.id, client, now()).unwrap();
        let err = job.accept_proposal(b.id, client, now()).unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(job.assigned_to, Some(a.freelancer_id));
        assert_eq!(job.proposal(b.id).unwrap().status, ProposalStatus::Pending);
    }

    #[test]
    fn reject_only_touches_the_proposal() {
        let client = Uuid::new_v4();
        let mut job = job_with(client, vec![]);
        let p = job
            .submit_proposal(Uuid::new_v4(), BigDecimal::from(50), "a".to_string(), now())
            .unwrap();

        job.reject_proposal(p.id, client, now()).unwrap();

        assert_eq!(job.proposal(p.id).unwrap().status, ProposalStatus::Rejected);
        assert_eq!(job.status, JobStatus::Open);
        assert!(job.assigned_to.is_none());
    }

    fn assigned_job(client: Uuid, freelancer: Uuid) -> Job {
        let mut job = job_with(client, vec![milestone("Design", 100), milestone("Build", 150)]);
        let p = job
            .submit_proposal(freelancer, BigDecimal::from(200), "hi".to_string(), now())
            .unwrap();
        job.accept_proposal(p.id, client, now()).unwrap();
        job
    }

    #[test]
    fn only_assignee_submits_milestones() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = assigned_job(client, freelancer);
        let m1 = job.milestones.0[0].id;

        let err = job
            .submit_milestone(m1, client, "work".to_string(), now())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert_eq!(job.milestones.0[0].status, MilestoneStatus::Pending);

        let submitted = job
            .submit_milestone(m1, freelancer, "https://repo".to_string(), now())
            .unwrap();
        assert_eq!(submitted.status, MilestoneStatus::Submitted);
        assert_eq!(submitted.submitted_at, Some(now()));
    }

    #[test]
    fn payment_status_follows_settled_milestones() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = assigned_job(client, freelancer);
        let (m1, m2) = (job.milestones.0[0].id, job.milestones.0[1].id);

        job.recompute_payment_status();
        assert_eq!(job.payment_status, JobPaymentStatus::Pending);

        job.approve_milestone(m1, None, now()).unwrap();
        assert_eq!(job.payment_status, JobPaymentStatus::Partial);

        job.complete_milestone_for_release(m1, now()).unwrap();
        assert_eq!(job.payment_status, JobPaymentStatus::Partial);

        job.approve_milestone(m2, Some("great".to_string()), now()).unwrap();
        assert_eq!(job.payment_status, JobPaymentStatus::Completed);
        assert_eq!(job.milestones.0[1].admin_notes.as_deref(), Some("great"));
    }

    #[test]
    fn reject_milestone_resets_submission() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = assigned_job(client, freelancer);
        let m1 = job.milestones.0[0].id;
        job.submit_milestone(m1, freelancer, "draft".to_string(), now()).unwrap();

        let rejected = job.reject_milestone(m1, None, now()).unwrap();

        assert_eq!(rejected.status, MilestoneStatus::Pending);
        assert!(rejected.submitted_work.is_none());
        assert!(rejected.submitted_at.is_none());
        assert_eq!(rejected.admin_notes.as_deref(), Some("Needs revision"));
    }

    #[test]
    fn approved_milestone_cannot_be_rejected() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = assigned_job(client, freelancer);
        let (m1, m2) = (job.milestones.0[0].id, job.milestones.0[1].id);

        job.approve_milestone(m1, None, now()).unwrap();
        job.approve_milestone(m2, None, now()).unwrap();
        assert_eq!(job.payment_status, JobPaymentStatus::Completed);

        let err = job.reject_milestone(m2, None, now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(job.milestones.0[1].status, MilestoneStatus::Approved);
        assert_eq!(job.payment_status, JobPaymentStatus::Completed);

        job.complete_milestone_for_release(m1, now()).unwrap();
        let err = job.reject_milestone(m1, None, now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(job.milestones.0[0].status, MilestoneStatus::Completed);
    }

    #[test]
    fn release_requires_approved_milestone() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let mut job = assigned_job(client, freelancer);
        let m1 = job.milestones.0[0].id;

        let err = job.complete_milestone_for_release(m1, now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        job.approve_milestone(m1, None, now()).unwrap();
        let (completed, payee) = job.complete_milestone_for_release(m1, now()).unwrap();
        assert_eq!(completed.status, MilestoneStatus::Completed);
        assert_eq!(payee, freelancer);
        assert_eq!(job.amount_paid, BigDecimal::from(100));

        // a second release finds the milestone completed
        let err = job.complete_milestone_for_release(m1, now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(job.amount_paid, BigDecimal::from(100));
    }

    #[test]
    fn status_change_and_delete_authorization() {
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let open = job_with(client, vec![]);
        assert!(open.ensure_deletable_by(client, 0).is_ok());
        assert!(matches!(
            open.ensure_deletable_by(stranger, 0).unwrap_err(),
            ServiceError::Forbidden { .. }
        ));

        let mut job = assigned_job(client, freelancer);
        assert!(matches!(
            job.ensure_deletable_by(client, 0).unwrap_err(),
            ServiceError::InvalidState(_)
        ));
        assert!(job.update_status(JobStatus::Completed, stranger, now()).is_err());
        assert_eq!(job.status, JobStatus::InProgress);
        job.update_status(JobStatus::Completed, freelancer, now()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn job_with_escrowed_payment_cannot_be_deleted() {
        let client = Uuid::new_v4();
        let open = job_with(client, vec![milestone("Design", 100)]);
        assert!(open.assigned_to.is_none());

        let err = open.ensure_deletable_by(client, 1).unwrap_err();
        match err {
            ServiceError::InvalidState(message) => assert!(message.contains("payment")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

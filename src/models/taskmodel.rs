use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};
use uuid::Uuid;

use crate::models::jobmodel::Job;
use crate::service::error::ServiceError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Accepted,
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn to_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Accepted => "accepted",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "accepted" => Ok(TaskStatus::Accepted),
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(ServiceError::invalid_state(format!(
                "'{}' is not a task status (expected pending, accepted, todo, in_progress, done or blocked)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeEntry {
    pub date: DateTime<Utc>,
    pub hours: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub job_id: Uuid,
    pub freelancer_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub milestone: Option<String>,
    pub status: TaskStatus,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub estimated_budget: BigDecimal,
    pub deadline: DateTime<Utc>,
    pub progress: i32,
    pub time_entries: Json<Vec<TimeEntry>>,
    pub client_approved: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn ensure_assignee(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.freelancer_id == user_id {
            Ok(())
        } else {
            Err(ServiceError::forbidden(user_id, format!("modify task {}", self.id)))
        }
    }

    /// Any of the six states may follow any other. `completed_at` is stamped
    /// on the first entry into `done` and kept afterwards.
    pub fn set_status(
        &mut self,
        status: TaskStatus,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.ensure_assignee(user_id)?;

        if status == TaskStatus::Done && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn add_time_entry(
        &mut self,
        entry: TimeEntry,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.ensure_assignee(user_id)?;

        if entry.hours.is_nan() || entry.hours <= 0.0 {
            return Err(ServiceError::Validation("Hours must be positive".to_string()));
        }

        self.actual_hours += entry.hours;
        self.time_entries.0.push(entry);
        self.updated_at = now;
        Ok(())
    }

    pub fn set_progress(
        &mut self,
        progress: i32,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.ensure_assignee(user_id)?;

        if !(0..=100).contains(&progress) {
            return Err(ServiceError::Validation(
                "Progress must be between 0 and 100".to_string(),
            ));
        }
        self.progress = progress;
        self.updated_at = now;
        Ok(())
    }
}

/// A task about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub job_id: Uuid,
    pub freelancer_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub milestone: Option<String>,
    pub status: TaskStatus,
    pub estimated_hours: f64,
    pub estimated_budget: BigDecimal,
    pub deadline: DateTime<Utc>,
    pub client_approved: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskDefaults {
    pub hours: f64,
    pub deadline_days: i64,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self { hours: 8.0, deadline_days: 30 }
    }
}

/// One task per milestone in stored order, or a single task mirroring the
/// job when it has no milestones.
pub fn plan_tasks_for_acceptance(
    job: &Job,
    freelancer_id: Uuid,
    defaults: TaskDefaults,
    now: DateTime<Utc>,
) -> Vec<NewTask> {
    let fallback_deadline = job
        .deadline
        .unwrap_or_else(|| now + Duration::days(defaults.deadline_days));
    let total_hours = job.estimated_hours.unwrap_or(defaults.hours);
    let milestones = &job.milestones.0;

    if milestones.is_empty() {
        return vec![NewTask {
            job_id: job.id,
            freelancer_id,
            client_id: job.client_id,
            title: job.title.clone(),
            description: job.description.clone(),
            milestone: None,
            status: TaskStatus::Pending,
            estimated_hours: total_hours,
            estimated_budget: job.total_budget.clone(),
            deadline: fallback_deadline,
            client_approved: true,
        }];
    }

    let count = milestones.len();
    let even_budget = (&job.total_budget / BigDecimal::from(count as i64)).round(2);
    let hours_each = total_hours / count as f64;

    milestones
        .iter()
        .map(|m| NewTask {
            job_id: job.id,
            freelancer_id,
            client_id: job.client_id,
            title: m.title.clone(),
            description: m.description.clone(),
            milestone: Some(m.title.clone()),
            status: TaskStatus::Pending,
            estimated_hours: hours_each,
            estimated_budget: if m.payment.is_zero() {
                even_budget.clone()
            } else {
                m.payment.clone()
            },
            deadline: m.due_date.unwrap_or(fallback_deadline),
            client_approved: true,
        })
        .collect()
}

/// Planned tasks that have no counterpart among `existing`, matched by
/// milestone label with multiplicity.
pub fn missing_tasks(
    job: &Job,
    freelancer_id: Uuid,
    existing: &[Task],
    defaults: TaskDefaults,
    now: DateTime<Utc>,
) -> Vec<NewTask> {
    let mut have: HashMap<Option<String>, usize> = HashMap::new();
    for task in existing {
        *have.entry(task.milestone.clone()).or_insert(0) += 1;
    }

    plan_tasks_for_acceptance(job, freelancer_id, defaults, now)
        .into_iter()
        .filter(|planned| match have.get_mut(&planned.milestone) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BurnoutWarning {
    pub date: NaiveDate,
    pub total_hours: f64,
    pub threshold: f64,
}

/// Days on which logged hours across all tasks exceed `threshold`.
pub fn burnout_warnings(tasks: &[Task], threshold: f64) -> Vec<BurnoutWarning> {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for entry in tasks.iter().flat_map(|t| t.time_entries.0.iter()) {
        *per_day.entry(entry.date.date_naive()).or_insert(0.0) += entry.hours;
    }

    per_day
        .into_iter()
        .filter(|(_, hours)| *hours > threshold)
        .map(|(date, total_hours)| BurnoutWarning { date, total_hours, threshold })
        .collect()
}

pub fn estimated_budget_total(tasks: &[NewTask]) -> BigDecimal {
    tasks.iter().map(|t| &t.estimated_budget).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::jobmodel::tests::{job_with, milestone, now};

    fn task_from(plan: NewTask) -> Task {
        Task {
            id: Uuid::new_v4(),
            job_id: plan.job_id,
            freelancer_id: plan.freelancer_id,
            client_id: plan.client_id,
            title: plan.title,
            description: plan.description,
            milestone: plan.milestone,
            status: plan.status,
            estimated_hours: plan.estimated_hours,
            actual_hours: 0.0,
            estimated_budget: plan.estimated_budget,
            deadline: plan.deadline,
            progress: 0,
            time_entries: Json(Vec::new()),
            client_approved: plan.client_approved,
            completed_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn fan_out_creates_one_task_per_milestone_in_order() {
        let job = job_with(Uuid::new_v4(), vec![milestone("Design", 100), milestone("Build", 150)]);
        let freelancer = Uuid::new_v4();

        let plans = plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now());

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].milestone.as_deref(), Some("Design"));
        assert_eq!(plans[1].milestone.as_deref(), Some("Build"));
        assert_eq!(plans[0].estimated_budget, BigDecimal::from(100));
        assert_eq!(plans[1].estimated_budget, BigDecimal::from(150));
        assert_eq!(estimated_budget_total(&plans), job.total_milestone_price);
        assert!(plans.iter().all(|p| p.status == TaskStatus::Pending && p.client_approved));
        assert!(plans.iter().all(|p| p.freelancer_id == freelancer));
        // 20 estimated hours split across two milestones
        assert_eq!(plans[0].estimated_hours, 10.0);
        assert_eq!(plans[0].deadline, now() + Duration::days(30));
    }

    #[test]
    fn fan_out_without_milestones_mirrors_the_job() {
        let mut job = job_with(Uuid::new_v4(), vec![]);
        job.estimated_hours = None;

        let plans = plan_tasks_for_acceptance(&job, Uuid::new_v4(), TaskDefaults::default(), now());

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, job.title);
        assert_eq!(plans[0].milestone, None);
        assert_eq!(plans[0].estimated_budget, job.total_budget);
        assert_eq!(plans[0].estimated_hours, 8.0);
    }

    #[test]
    fn zero_payment_milestone_gets_even_share_and_due_date_wins() {
        let due = now() + Duration::days(3);
        let mut free = milestone("Kickoff", 0);
        free.due_date = Some(due);
        let mut job = job_with(Uuid::new_v4(), vec![free, milestone("Build", 150)]);
        job.estimated_hours = None;
        job.deadline = Some(now() + Duration::days(10));

        let plans = plan_tasks_for_acceptance(&job, Uuid::new_v4(), TaskDefaults::default(), now());

        // total budget 250 over two milestones
        assert_eq!(plans[0].estimated_budget, BigDecimal::from(125));
        assert_eq!(plans[0].deadline, due);
        assert_eq!(plans[1].deadline, now() + Duration::days(10));
        assert_eq!(plans[0].estimated_hours, 4.0);
    }

    #[test]
    fn status_is_permissive_and_completed_at_stamped_once() {
        let job = job_with(Uuid::new_v4(), vec![]);
        let freelancer = Uuid::new_v4();
        let mut task = task_from(
            plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now()).remove(0),
        );

        task.set_status(TaskStatus::Done, freelancer, now()).unwrap();
        assert_eq!(task.completed_at, Some(now()));

        let later = now() + Duration::hours(5);
        task.set_status(TaskStatus::Blocked, freelancer, later).unwrap();
        task.set_status(TaskStatus::Pending, freelancer, later).unwrap();
        task.set_status(TaskStatus::Done, freelancer, later).unwrap();
        assert_eq!(task.completed_at, Some(now()));
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[test]
    fn only_assigned_freelancer_mutates_task() {
        let job = job_with(Uuid::new_v4(), vec![]);
        let freelancer = Uuid::new_v4();
        let mut task = task_from(
            plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now()).remove(0),
        );
        let stranger = Uuid::new_v4();

        assert!(matches!(
            task.set_status(TaskStatus::Done, stranger, now()).unwrap_err(),
            ServiceError::Forbidden { .. }
        ));
        let entry = TimeEntry { date: now(), hours: 2.0, description: "x".to_string() };
        assert!(task.add_time_entry(entry, stranger, now()).is_err());
        assert!(task.set_progress(50, stranger, now()).is_err());

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.actual_hours, 0.0);
        assert!(task.time_entries.0.is_empty());
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn time_entries_accumulate_without_cap() {
        let job = job_with(Uuid::new_v4(), vec![]);
        let freelancer = Uuid::new_v4();
        let mut task = task_from(
            plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now()).remove(0),
        );

        for hours in [6.0, 5.5, 1.5] {
            let entry = TimeEntry { date: now(), hours, description: "coding".to_string() };
            task.add_time_entry(entry, freelancer, now()).unwrap();
        }

        assert_eq!(task.actual_hours, 13.0);
        assert_eq!(task.time_entries.0.len(), 3);

        let zero = TimeEntry { date: now(), hours: 0.0, description: "noop".to_string() };
        assert!(matches!(
            task.add_time_entry(zero, freelancer, now()).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn unknown_status_string_is_invalid_state() {
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!(matches!(
            "finished".parse::<TaskStatus>().unwrap_err(),
            ServiceError::InvalidState(_)
        ));
    }

    #[test]
    fn progress_is_bounded() {
        let job = job_with(Uuid::new_v4(), vec![]);
        let freelancer = Uuid::new_v4();
        let mut task = task_from(
            plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now()).remove(0),
        );
        assert!(task.set_progress(101, freelancer, now()).is_err());
        task.set_progress(100, freelancer, now()).unwrap();
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn reconciliation_plans_only_missing_milestones() {
        let job = job_with(
            Uuid::new_v4(),
            vec![milestone("Design", 100), milestone("Build", 150), milestone("Build", 20)],
        );
        let freelancer = Uuid::new_v4();
        let plans = plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now());
        let existing = vec![task_from(plans[1].clone())];

        let missing = missing_tasks(&job, freelancer, &existing, TaskDefaults::default(), now());

        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].milestone.as_deref(), Some("Design"));
        assert_eq!(missing[1].milestone.as_deref(), Some("Build"));
        assert_eq!(missing[1].estimated_budget, BigDecimal::from(20));

        let all: Vec<Task> = plans.into_iter().map(task_from).collect();
        assert!(missing_tasks(&job, freelancer, &all, TaskDefaults::default(), now()).is_empty());
    }

    #[test]
    fn burnout_sums_same_day_entries_across_tasks() {
        let job = job_with(Uuid::new_v4(), vec![milestone("A", 1), milestone("B", 1)]);
        let freelancer = Uuid::new_v4();
        let mut tasks: Vec<Task> = plan_tasks_for_acceptance(&job, freelancer, TaskDefaults::default(), now())
            .into_iter()
            .map(task_from)
            .collect();

        let next_day = now() + Duration::days(1);
        tasks[0]
            .add_time_entry(TimeEntry { date: now(), hours: 5.0, description: "a".into() }, freelancer, now())
            .unwrap();
        tasks[1]
            .add_time_entry(TimeEntry { date: now(), hours: 4.0, description: "b".into() }, freelancer, now())
            .unwrap();
        tasks[1]
            .add_time_entry(TimeEntry { date: next_day, hours: 8.0, description: "c".into() }, freelancer, now())
            .unwrap();

        let warnings = burnout_warnings(&tasks, 8.0);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].date, now().date_naive());
        assert_eq!(warnings[0].total_hours, 9.0);
    }
}

// service/acceptance_hooks.rs
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    dtos::jobdtos::SideEffectDto,
    models::jobmodel::{Job, Proposal},
    service::{chat_service::ChatService, error::ServiceError},
};

pub const CONVERSATION_HOOK: &str = "conversation";

/// Snapshot of a committed acceptance handed to every hook.
#[derive(Debug, Clone)]
pub struct AcceptedProposal {
    pub job: Job,
    pub proposal: Proposal,
}

/// Runs after the acceptance transaction commits. A failing hook never
/// undoes the acceptance.
#[async_trait]
pub trait AcceptanceHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns an identifier for whatever the hook produced, if anything.
    async fn on_accepted(&self, accepted: &AcceptedProposal) -> Result<Option<String>, ServiceError>;
}

pub struct ConversationHook {
    chat_service: Arc<ChatService>,
}

impl ConversationHook {
    pub fn new(chat_service: Arc<ChatService>) -> Self {
        Self { chat_service }
    }
}

#[async_trait]
impl AcceptanceHook for ConversationHook {
    fn name(&self) -> &'static str {
        CONVERSATION_HOOK
    }

    async fn on_accepted(&self, accepted: &AcceptedProposal) -> Result<Option<String>, ServiceError> {
        let conversation = self
            .chat_service
            .get_or_create_conversation(
                accepted.job.client_id,
                accepted.proposal.freelancer_id,
                Some(accepted.job.id),
            )
            .await?;

        Ok(Some(conversation.id))
    }
}

/// Every hook is attempted; one failing does not stop the others.
pub async fn run_acceptance_hooks(
    hooks: &[Arc<dyn AcceptanceHook>],
    accepted: &AcceptedProposal,
) -> Vec<SideEffectDto> {
    let runs = hooks.iter().map(|hook| async move {
        (hook.name(), hook.on_accepted(accepted).await)
    });

    join_all(runs)
        .await
        .into_iter()
        .map(|(name, result)| match result {
            Ok(reference) => {
                tracing::info!(
                    job_id = %accepted.job.id,
                    hook = name,
                    reference = ?reference,
                    "acceptance side effect completed"
                );
                SideEffectDto {
                    name: name.to_string(),
                    succeeded: true,
                    reference,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %accepted.job.id,
                    hook = name,
                    error = %e,
                    "acceptance side effect failed"
                );
                SideEffectDto {
                    name: name.to_string(),
                    succeeded: false,
                    reference: None,
                    error: Some(e.public_message()),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorMessage;
    use crate::models::jobmodel::tests::{job_with, now};
    use sqlx::types::BigDecimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct Recording {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AcceptanceHook for Recording {
        fn name(&self) -> &'static str {
            if self.fail { "broken" } else { "recording" }
        }

        async fn on_accepted(&self, accepted: &AcceptedProposal) -> Result<Option<String>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ServiceError::Other("chat backend unavailable".to_string()))
            } else {
                Ok(Some(accepted.job.id.to_string()))
            }
        }
    }

    fn accepted() -> AcceptedProposal {
        let client = Uuid::new_v4();
        let mut job = job_with(client, vec![]);
        let proposal = job
            .submit_proposal(Uuid::new_v4(), BigDecimal::from(80), "hi".to_string(), now())
            .unwrap();
        let proposal = job.accept_proposal(proposal.id, client, now()).unwrap();
        AcceptedProposal { job, proposal }
    }

    #[tokio::test]
    async fn failing_hook_does_not_stop_the_others() {
        let broken = Arc::new(Recording { calls: AtomicUsize::new(0), fail: true });
        let working = Arc::new(Recording { calls: AtomicUsize::new(0), fail: false });
        let hooks: Vec<Arc<dyn AcceptanceHook>> = vec![broken.clone(), working.clone()];
        let accepted = accepted();

        let reports = run_acceptance_hooks(&hooks, &accepted).await;

        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reports.len(), 2);
        assert!(!reports[0].succeeded);
        assert!(reports[0].error.as_deref().unwrap().contains("chat backend unavailable"));
        assert!(reports[1].succeeded);
        assert_eq!(reports[1].reference, Some(accepted.job.id.to_string()));
    }

    struct Unreachable;

    #[async_trait]
    impl AcceptanceHook for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn on_accepted(&self, _: &AcceptedProposal) -> Result<Option<String>, ServiceError> {
            Err(ServiceError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn database_failures_are_reported_without_details() {
        let hooks: Vec<Arc<dyn AcceptanceHook>> = vec![Arc::new(Unreachable)];

        let reports = run_acceptance_hooks(&hooks, &accepted()).await;

        assert!(!reports[0].succeeded);
        assert_eq!(
            reports[0].error.as_deref(),
            Some(ErrorMessage::ServerError.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn no_hooks_no_reports() {
        let reports = run_acceptance_hooks(&[], &accepted()).await;
        assert!(reports.is_empty());
    }
}

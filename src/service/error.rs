use thiserror::Error;
use uuid::Uuid;
use sqlx::types::BigDecimal;
use crate::error::{ErrorMessage, HttpError};
use axum::http::StatusCode;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Proposal {0} not found")]
    ProposalNotFound(Uuid),

    #[error("Milestone {0} not found")]
    MilestoneNotFound(Uuid),

    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Conversation {0} not found")]
    ConversationNotFound(String),

    #[error("User {user_id} is not allowed to {action}")]
    Forbidden { user_id: Uuid, action: String },

    #[error("Freelancer {freelancer_id} already submitted a proposal for job {job_id}")]
    DuplicateProposal { job_id: Uuid, freelancer_id: Uuid },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: BigDecimal, available: BigDecimal },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn forbidden(user_id: Uuid, action: impl Into<String>) -> Self {
        ServiceError::Forbidden { user_id, action: action.into() }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ServiceError::InvalidState(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::JobNotFound(_)
            | ServiceError::ProposalNotFound(_)
            | ServiceError::MilestoneNotFound(_)
            | ServiceError::TaskNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::ConversationNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,

            ServiceError::DuplicateProposal { .. } => StatusCode::CONFLICT,

            ServiceError::InvalidState(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,

            ServiceError::Database(_)
            | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServiceError {
    /// Text safe to hand back to a caller. Database errors are logged and
    /// replaced by a generic message.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Database(e) => {
                tracing::error!("database error: {}", e);
                ErrorMessage::ServerError.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::new(error.public_message(), error.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        let id = Uuid::new_v4();
        assert_eq!(ServiceError::JobNotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::forbidden(id, "accept proposal").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::DuplicateProposal { job_id: id, freelancer_id: id }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServiceError::invalid_state("nope").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::InsufficientFunds {
                requested: BigDecimal::from(500),
                available: BigDecimal::from(300),
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn http_error_carries_precondition_message() {
        let id = Uuid::new_v4();
        let http: HttpError = ServiceError::forbidden(id, "delete this job").into();
        assert_eq!(http.status, StatusCode::FORBIDDEN);
        assert!(http.message.contains("delete this job"));
    }

    #[test]
    fn database_errors_are_masked() {
        let error = ServiceError::Database(sqlx::Error::RowNotFound);
        assert_eq!(error.public_message(), ErrorMessage::ServerError.to_string());

        let http: HttpError = ServiceError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, ErrorMessage::ServerError.to_string());
    }
}

// service/chat_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, db::DBClient, userdb::UserExt},
    models::chatmodels::Conversation,
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn get_or_create_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Conversation, ServiceError> {
        if participant_a == participant_b {
            return Err(ServiceError::Validation(
                "A conversation needs two different participants".to_string(),
            ));
        }

        self.db_client
            .get_user(participant_b)
            .await?
            .ok_or(ServiceError::UserNotFound(participant_b))?;

        let conversation = self
            .db_client
            .create_or_get_conversation(participant_a, participant_b, job_id)
            .await?;

        tracing::debug!(conversation_id = %conversation.id, "conversation ready");
        Ok(conversation)
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: Uuid,
    ) -> Result<Conversation, ServiceError> {
        let conversation = self
            .db_client
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| ServiceError::ConversationNotFound(conversation_id.to_string()))?;

        if conversation.participant_one_id != user_id && conversation.participant_two_id != user_id {
            return Err(ServiceError::forbidden(user_id, format!("read conversation {}", conversation_id)));
        }
        Ok(conversation)
    }

    pub async fn get_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.db_client.get_user_conversations(user_id, limit, offset).await?)
    }
}

// db/chatdb.rs
use async_trait::async_trait;
use uuid::Uuid;
use sqlx::Error;
use super::db::DBClient;
use crate::models::chatmodels::*;

#[async_trait]
pub trait ChatExt {
    /// Idempotent: concurrent callers for the same pair end up with one row.
    async fn create_or_get_conversation(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Conversation, Error>;

    async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, Error>;

    async fn get_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_or_get_conversation(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Conversation, Error> {
        let id = conversation_id(user_one_id, user_two_id);
        let (first, second) = ordered_pair(user_one_id, user_two_id);

        sqlx::query(
            r#"
            INSERT INTO conversations (id, participant_one_id, participant_two_id, job_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#
        )
        .bind(&id)
        .bind(first)
        .bind(second)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, participant_one_id, participant_two_id, job_id, status,
                   last_message_at, created_at
            FROM conversations
            WHERE id = $1
            "#
        )
        .bind(&id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, participant_one_id, participant_two_id, job_id, status,
                   last_message_at, created_at
            FROM conversations
            WHERE id = $1
            "#
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, participant_one_id, participant_two_id, job_id, status,
                   last_message_at, created_at
            FROM conversations
            WHERE participant_one_id = $1 OR participant_two_id = $1
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}

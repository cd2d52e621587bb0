// models/chatmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "chat_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Active,
    Archived,
    Blocked,
}

#[derive(Debug, Serialize, Clone, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub participant_one_id: Uuid,
    pub participant_two_id: Uuid,
    pub job_id: Option<Uuid>,
    pub status: ChatStatus,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Sorted pair joined with `_`; the same two users always share one id.
pub fn conversation_id(a: Uuid, b: Uuid) -> String {
    let (first, second) = ordered_pair(a, b);
    format!("{}_{}", first, second)
}

pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    let (a_str, b_str) = (a.to_string(), b.to_string());
    if a_str <= b_str {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ignores_argument_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(conversation_id(a, b), conversation_id(b, a));
        assert_ne!(conversation_id(a, b), conversation_id(a, Uuid::new_v4()));
    }

    #[test]
    fn id_is_sorted_concatenation() {
        let low = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let high = Uuid::parse_str("ffffffff-0000-0000-0000-000000000000").unwrap();

        assert_eq!(
            conversation_id(high, low),
            "00000000-0000-0000-0000-000000000001_ffffffff-0000-0000-0000-000000000000"
        );
        assert_eq!(ordered_pair(high, low), (low, high));
    }
}

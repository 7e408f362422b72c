use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Máximo de mensagens mantidas por histórico
pub const MAX_CHAT_MESSAGES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub content: String,
    pub created_at: i64,
}

/// Histórico de chat de um usuário (um documento por usuário)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatHistory {
    pub fn new(user_id: ObjectId, now: i64) -> Self {
        ChatHistory {
            id: None,
            user_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AppendMessageRequest {
    pub sender: ChatSender,
    pub content: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatHistoryResponse {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ChatHistory> for ChatHistoryResponse {
    fn from(h: ChatHistory) -> Self {
        ChatHistoryResponse {
            id: h.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: h.user_id.to_hex(),
            messages: h.messages,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_is_empty() {
        let user = ObjectId::new();
        let history = ChatHistory::new(user, 7);
        assert!(history.id.is_none());
        assert!(history.messages.is_empty());

        let response = ChatHistoryResponse::from(history);
        assert_eq!(response.user_id, user.to_hex());
        assert_eq!(response.id, "");
        assert_eq!(response.updated_at, 7);
    }
}

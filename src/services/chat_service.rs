use crate::{
    database::{MongoDB, CHAT_HISTORIES},
    models::{AppendMessageRequest, ChatHistory, ChatMessage, MAX_CHAT_MESSAGES},
    utils::AppError,
};
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

const MAX_MESSAGE_LEN: usize = 4000;

pub async fn get_history(db: &MongoDB, user_id: &ObjectId) -> Result<ChatHistory, AppError> {
    let history = db
        .collection::<ChatHistory>(CHAT_HISTORIES)
        .find_one(doc! { "user_id": user_id })
        .await?;

    // Usuário sem histórico recebe um histórico vazio (não persistido)
    Ok(history.unwrap_or_else(|| ChatHistory::new(*user_id, chrono::Utc::now().timestamp())))
}

fn validate_message(request: &AppendMessageRequest) -> Result<String, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidRequest("Message content is required".into()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Message is longer than {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(content.to_string())
}

/// Upsert that appends one message and keeps only the newest
/// `MAX_CHAT_MESSAGES`, so concurrent appends never overwrite each other.
fn append_update(user_id: &ObjectId, message: &ChatMessage) -> Result<(Document, Document), AppError> {
    let entry = to_bson(message)?;
    let keep_newest = -(MAX_CHAT_MESSAGES as i64);

    let filter = doc! { "user_id": user_id };
    let update = doc! {
        "$push": {
            "messages": { "$each": [entry], "$slice": keep_newest }
        },
        "$set": { "updated_at": message.created_at },
        "$setOnInsert": { "created_at": message.created_at }
    };
    Ok((filter, update))
}

/// Appends a message to the user's history, creating it on first use.
pub async fn append_message(
    db: &MongoDB,
    user_id: &ObjectId,
    request: &AppendMessageRequest,
) -> Result<ChatHistory, AppError> {
    let message = ChatMessage {
        sender: request.sender,
        content: validate_message(request)?,
        created_at: chrono::Utc::now().timestamp(),
    };

    let (filter, update) = append_update(user_id, &message)?;
    db.collection::<ChatHistory>(CHAT_HISTORIES)
        .update_one(filter, update)
        .upsert(true)
        .await?;

    get_history(db, user_id).await
}

pub async fn clear_history(db: &MongoDB, user_id: &ObjectId) -> Result<bool, AppError> {
    let result = db
        .collection::<ChatHistory>(CHAT_HISTORIES)
        .delete_one(doc! { "user_id": user_id })
        .await?;
    Ok(result.deleted_count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatSender;

    #[test]
    fn test_validate_message() {
        let ok = AppendMessageRequest { sender: ChatSender::User, content: "  where can I return my cup? ".into() };
        assert_eq!(validate_message(&ok).unwrap(), "where can I return my cup?");

        let empty = AppendMessageRequest { sender: ChatSender::User, content: "   ".into() };
        assert!(validate_message(&empty).is_err());

        let long = AppendMessageRequest { sender: ChatSender::Assistant, content: "a".repeat(MAX_MESSAGE_LEN + 1) };
        assert!(validate_message(&long).is_err());
    }

    #[test]
    fn test_append_pushes_with_retention() {
        let user = ObjectId::new();
        let message = ChatMessage { sender: ChatSender::Assistant, content: "Any partner cafe".into(), created_at: 99 };
        let (filter, update) = append_update(&user, &message).unwrap();

        assert_eq!(filter.get_object_id("user_id").unwrap(), user);
        let push = update.get_document("$push").unwrap().get_document("messages").unwrap();
        assert_eq!(push.get_i64("$slice").unwrap(), -(MAX_CHAT_MESSAGES as i64));
        let each = push.get_array("$each").unwrap();
        assert_eq!(each.len(), 1);
        assert_eq!(each[0].as_document().unwrap().get_str("sender").unwrap(), "assistant");
        assert_eq!(update.get_document("$setOnInsert").unwrap().get_i64("created_at").unwrap(), 99);
    }
}

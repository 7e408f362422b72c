use actix_web::{delete, get, post, web, HttpResponse};

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{AppendMessageRequest, ChatHistoryResponse};
use crate::services::chat_service;
use crate::utils::AppError;

/// GET /api/v1/chat-history - Histórico do assistente do usuário logado
#[utoipa::path(
    get,
    path = "/api/v1/chat-history",
    tag = "Chat",
    responses((status = 200, description = "Chat history (empty if none yet)", body = ChatHistoryResponse)),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_chat_history(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let history = chat_service::get_history(&db, &user.user_id()?).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "history": ChatHistoryResponse::from(history)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat-history/messages",
    tag = "Chat",
    request_body = AppendMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = ChatHistoryResponse),
        (status = 400, description = "Empty or oversized message")
    ),
    security(("bearer_auth" = []))
)]
#[post("/messages")]
pub async fn append_chat_message(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<AppendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let history = chat_service::append_message(&db, &user.user_id()?, &body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "history": ChatHistoryResponse::from(history)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/chat-history",
    tag = "Chat",
    responses((status = 200, description = "History cleared")),
    security(("bearer_auth" = []))
)]
#[delete("")]
pub async fn clear_chat_history(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let cleared = chat_service::clear_history(&db, &user.user_id()?).await?;
    log::info!("🧹 Chat history cleared for {} (existed: {})", user.sub, cleared);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "cleared": cleared
    })))
}

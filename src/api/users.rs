use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{ActivitySummary, CreateUserRequest, PaginationQuery, Role, UpdateUserRequest, UserInfo};
use crate::services::{activity_service, user_service};
use crate::utils::{parse_object_id, AppError};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

/// GET /api/v1/users - Lista usuários (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    params(
        ("role" = Option<String>, Query, description = "admin | staff | customer"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<u64>, Query, description = "Items to skip")
    ),
    responses(
        (status = 200, description = "Users", body = [UserInfo]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_users(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let page = PaginationQuery { limit: query.limit, offset: query.offset };

    let (users, total) = user_service::list_users(&db, query.role, &page).await?;
    let users: Vec<UserInfo> = users.into_iter().map(UserInfo::from).collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "users": users,
        "total": total,
        "limit": page.limit(),
        "offset": page.offset()
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    responses(
        (status = 200, description = "User", body = UserInfo),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "user")?;
    user.require_self_or_admin(&id)?;

    let found = user_service::get_user(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserInfo::from(found)
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/summary",
    tag = "Users",
    responses(
        (status = 200, description = "Activity summary", body = ActivitySummary),
        (status = 403, description = "Not your account")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}/summary")]
pub async fn get_user_summary(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "user")?;
    let summary = activity_service::user_summary(&db, &user, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": summary
    })))
}

/// POST /api/v1/users - Cria staff, admin ou cliente (admin)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Staff without restaurant or invalid fields"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    log::info!("👤 POST /users - {} ({})", body.email, body.role);

    let created = user_service::create_user(&db, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "user": UserInfo::from(created)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserInfo),
        (status = 403, description = "Not allowed to change these fields")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}")]
pub async fn update_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "user")?;

    let updated = user_service::update_user(&db, &user, &id, &body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserInfo::from(updated)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "user")?;

    user_service::delete_user(&db, &user, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User deleted"
    })))
}

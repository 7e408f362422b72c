use actix_web::{delete, get, post, web, HttpResponse};

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{ActivityQuery, ActivityResponse, CreateActivityRequest, PaginationQuery, Role};
use crate::services::activity_service;
use crate::utils::{parse_object_id, AppError};

/// GET /api/v1/activities - Histórico de atividades (escopo pelo papel)
#[utoipa::path(
    get,
    path = "/api/v1/activities",
    tag = "Activities",
    params(
        ("user_id" = Option<String>, Query, description = "Admin/staff filter"),
        ("restaurant_id" = Option<String>, Query, description = "Admin filter"),
        ("container_id" = Option<String>, Query, description = "Container filter"),
        ("kind" = Option<String>, Query, description = "registration | rebate | status_change | container_created"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<u64>, Query, description = "Items to skip")
    ),
    responses((status = 200, description = "Activities, newest first", body = [ActivityResponse])),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_activities(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let (activities, total) = activity_service::list_activities(&db, &user, &query).await?;
    let page = PaginationQuery { limit: query.limit, offset: query.offset };
    let activities: Vec<ActivityResponse> = activities.into_iter().map(ActivityResponse::from).collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "activities": activities,
        "total": total,
        "limit": page.limit(),
        "offset": page.offset()
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/activities",
    tag = "Activities",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity recorded", body = ActivityResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_activity(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateActivityRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    log::info!("📝 POST /activities - {} for {}", body.kind.as_str(), body.user_id);

    let activity = activity_service::create_activity(&db, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "activity": ActivityResponse::from(activity)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/activities/{id}",
    tag = "Activities",
    responses(
        (status = 200, description = "Activity deleted"),
        (status = 404, description = "Activity not found")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_activity(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "activity")?;

    activity_service::delete_activity(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Activity deleted"
    })))
}

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    ContainerResponse, ContainerStats, GenerateContainersRequest, PaginationQuery, ProcessRebateRequest,
    RebateReceipt, RegisterContainerRequest, Role, UpdateContainerStatusRequest,
};
use crate::services::container_service::{self, ContainerQuery};
use crate::utils::{parse_object_id, AppError};

/// GET /api/v1/containers - Lista containers (clientes veem apenas os seus)
#[utoipa::path(
    get,
    path = "/api/v1/containers",
    tag = "Containers",
    params(
        ("status" = Option<String>, Query, description = "available | active | returned | lost | damaged"),
        ("customer_id" = Option<String>, Query, description = "Staff/admin only"),
        ("container_type_id" = Option<String>, Query, description = "Container type filter"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<u64>, Query, description = "Items to skip")
    ),
    responses((status = 200, description = "Containers", body = [ContainerResponse])),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_containers(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<ContainerQuery>,
) -> Result<HttpResponse, AppError> {
    let (containers, total) = container_service::list_containers(&db, &user, &query).await?;
    let page = PaginationQuery { limit: query.limit, offset: query.offset };
    let containers: Vec<ContainerResponse> = containers.into_iter().map(ContainerResponse::from).collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "containers": containers,
        "total": total,
        "limit": page.limit(),
        "offset": page.offset()
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/containers/stats",
    tag = "Containers",
    responses(
        (status = 200, description = "Counts per status", body = ContainerStats),
        (status = 403, description = "Staff or admin only")
    ),
    security(("bearer_auth" = []))
)]
#[get("/stats")]
pub async fn get_container_stats(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin, Role::Staff])?;
    let stats = container_service::container_stats(&db).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "stats": stats
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/containers/qr/{qr_code}",
    tag = "Containers",
    responses(
        (status = 200, description = "Container", body = ContainerResponse),
        (status = 400, description = "Unrecognized QR code"),
        (status = 404, description = "Container not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/qr/{qr_code}")]
pub async fn get_container_by_qr(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let container = container_service::get_container_by_qr(&db, &user, &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container": ContainerResponse::from(container)
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/containers/{id}",
    tag = "Containers",
    responses(
        (status = 200, description = "Container", body = ContainerResponse),
        (status = 404, description = "Container not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_container(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "container")?;
    let container = container_service::get_container(&db, &user, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container": ContainerResponse::from(container)
    })))
}

/// POST /api/v1/containers - Gera um lote de containers (admin)
#[utoipa::path(
    post,
    path = "/api/v1/containers",
    tag = "Containers",
    request_body = GenerateContainersRequest,
    responses(
        (status = 201, description = "Containers generated", body = [ContainerResponse]),
        (status = 400, description = "Quantity out of range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn generate_containers(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<GenerateContainersRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let type_id = parse_object_id(&body.container_type_id, "container type")?;
    let quantity = body.quantity.unwrap_or(1);
    log::info!("📦 POST /containers - {} x {}", quantity, body.container_type_id);

    let containers = container_service::generate_containers(db.get_ref(), user.user_id()?, &type_id, quantity).await?;
    let containers: Vec<ContainerResponse> = containers.into_iter().map(ContainerResponse::from).collect();

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "total": containers.len(),
        "containers": containers
    })))
}

/// POST /api/v1/containers/register - Cliente registra um container escaneado
#[utoipa::path(
    post,
    path = "/api/v1/containers/register",
    tag = "Containers",
    request_body = RegisterContainerRequest,
    responses(
        (status = 200, description = "Container registered", body = ContainerResponse),
        (status = 400, description = "Container is not available"),
        (status = 404, description = "Unknown QR code"),
        (status = 409, description = "Container changed concurrently")
    ),
    security(("bearer_auth" = []))
)]
#[post("/register")]
pub async fn register_container(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<RegisterContainerRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Customer])?;
    log::info!("📲 POST /containers/register - user: {}", user.sub);

    let container = container_service::register_container(db.get_ref(), user.user_id()?, &body.qr_code).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container": ContainerResponse::from(container)
    })))
}

/// POST /api/v1/containers/process-rebate - Staff processa a devolução
#[utoipa::path(
    post,
    path = "/api/v1/containers/process-rebate",
    tag = "Containers",
    request_body = ProcessRebateRequest,
    responses(
        (status = 200, description = "Rebate paid", body = RebateReceipt),
        (status = 400, description = "Container not active or no rebate configured"),
        (status = 403, description = "Not allowed for this restaurant"),
        (status = 409, description = "Container changed concurrently")
    ),
    security(("bearer_auth" = []))
)]
#[post("/process-rebate")]
pub async fn process_rebate(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<ProcessRebateRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("💸 POST /containers/process-rebate - by {} ({})", user.sub, user.role);

    let receipt =
        container_service::process_rebate(db.get_ref(), &user, &body.qr_code, body.restaurant_id.as_deref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "receipt": receipt
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/containers/{id}/status",
    tag = "Containers",
    request_body = UpdateContainerStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ContainerResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 409, description = "Container changed concurrently")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}/status")]
pub async fn update_container_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateContainerStatusRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin, Role::Staff])?;
    let id = parse_object_id(&path.into_inner(), "container")?;
    let body = body.into_inner();
    log::info!("🔄 PUT /containers/{}/status -> {}", id.to_hex(), body.status);

    let container =
        container_service::update_status(db.get_ref(), user.user_id()?, &id, body.status, body.notes).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container": ContainerResponse::from(container)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/containers/{id}",
    tag = "Containers",
    responses(
        (status = 200, description = "Container deleted"),
        (status = 404, description = "Container not found")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_container(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "container")?;

    container_service::delete_container(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Container deleted"
    })))
}

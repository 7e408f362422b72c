use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{ContainerTypeResponse, CreateContainerTypeRequest, Role, UpdateContainerTypeRequest};
use crate::services::container_type_service;
use crate::utils::{parse_object_id, AppError};

#[utoipa::path(
    get,
    path = "/api/v1/container-types",
    tag = "Container Types",
    responses((status = 200, description = "Container types", body = [ContainerTypeResponse])),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_container_types(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let types: Vec<ContainerTypeResponse> = container_type_service::list_container_types(&db)
        .await?
        .into_iter()
        .map(ContainerTypeResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": types.len(),
        "container_types": types
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/container-types/{id}",
    tag = "Container Types",
    responses(
        (status = 200, description = "Container type", body = ContainerTypeResponse),
        (status = 404, description = "Container type not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_container_type(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "container type")?;
    let container_type = container_type_service::get_container_type(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container_type": ContainerTypeResponse::from(container_type)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/container-types",
    tag = "Container Types",
    request_body = CreateContainerTypeRequest,
    responses(
        (status = 201, description = "Container type created", body = ContainerTypeResponse),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_container_type(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateContainerTypeRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let container_type = container_type_service::create_container_type(&db, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "container_type": ContainerTypeResponse::from(container_type)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/container-types/{id}",
    tag = "Container Types",
    request_body = UpdateContainerTypeRequest,
    responses(
        (status = 200, description = "Container type updated", body = ContainerTypeResponse),
        (status = 404, description = "Container type not found")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}")]
pub async fn update_container_type(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateContainerTypeRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "container type")?;

    let container_type = container_type_service::update_container_type(&db, &id, &body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "container_type": ContainerTypeResponse::from(container_type)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/container-types/{id}",
    tag = "Container Types",
    responses(
        (status = 200, description = "Container type deleted"),
        (status = 409, description = "Type still in use")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_container_type(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "container type")?;

    container_type_service::delete_container_type(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Container type deleted"
    })))
}

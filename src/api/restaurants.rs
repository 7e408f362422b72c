use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    CreateRestaurantRequest, RebateRateInput, RestaurantResponse, Role, UpdateRestaurantRequest,
};
use crate::services::restaurant_service;
use crate::utils::{parse_object_id, AppError};

#[derive(Debug, Deserialize)]
pub struct RestaurantListQuery {
    pub active: Option<bool>,
}

/// GET /api/v1/restaurants - Lista restaurantes parceiros
#[utoipa::path(
    get,
    path = "/api/v1/restaurants",
    tag = "Restaurants",
    params(("active" = Option<bool>, Query, description = "Filter by active flag")),
    responses((status = 200, description = "Restaurants", body = [RestaurantResponse])),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_restaurants(
    db: web::Data<MongoDB>,
    query: web::Query<RestaurantListQuery>,
) -> Result<HttpResponse, AppError> {
    let restaurants: Vec<RestaurantResponse> = restaurant_service::list_restaurants(&db, query.active)
        .await?
        .into_iter()
        .map(RestaurantResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": restaurants.len(),
        "restaurants": restaurants
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{id}",
    tag = "Restaurants",
    responses(
        (status = 200, description = "Restaurant", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_restaurant(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path.into_inner(), "restaurant")?;
    let restaurant = restaurant_service::get_restaurant(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "restaurant": RestaurantResponse::from(restaurant)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/restaurants",
    tag = "Restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_restaurant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateRestaurantRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    log::info!("🏪 POST /restaurants - {}", body.name);

    let restaurant = restaurant_service::create_restaurant(&db, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "restaurant": RestaurantResponse::from(restaurant)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/restaurants/{id}",
    tag = "Restaurants",
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}")]
pub async fn update_restaurant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateRestaurantRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "restaurant")?;

    let restaurant = restaurant_service::update_restaurant(&db, &id, &body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "restaurant": RestaurantResponse::from(restaurant)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/restaurants/{id}",
    tag = "Restaurants",
    responses(
        (status = 200, description = "Restaurant deleted"),
        (status = 409, description = "Staff still attached")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_restaurant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "restaurant")?;

    restaurant_service::delete_restaurant(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Restaurant deleted"
    })))
}

/// PUT /api/v1/restaurants/{id}/rebates - Cria ou atualiza o rebate de um tipo
#[utoipa::path(
    put,
    path = "/api/v1/restaurants/{id}/rebates",
    tag = "Restaurants",
    request_body = RebateRateInput,
    responses(
        (status = 200, description = "Rebate table updated", body = RestaurantResponse),
        (status = 404, description = "Restaurant or container type not found")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}/rebates")]
pub async fn set_rebate(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<RebateRateInput>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let id = parse_object_id(&path.into_inner(), "restaurant")?;
    log::info!("💰 PUT /restaurants/{}/rebates - type {} = {}", id.to_hex(), body.container_type_id, body.amount);

    let restaurant = restaurant_service::set_rebate(&db, &id, &body).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "restaurant": RestaurantResponse::from(restaurant)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/restaurants/{id}/rebates/{type_id}",
    tag = "Restaurants",
    responses(
        (status = 200, description = "Rebate removed", body = RestaurantResponse),
        (status = 404, description = "Restaurant or rebate not found")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}/rebates/{type_id}")]
pub async fn remove_rebate(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    let (id, type_id) = path.into_inner();
    let id = parse_object_id(&id, "restaurant")?;
    let type_id = parse_object_id(&type_id, "container type")?;

    let restaurant = restaurant_service::remove_rebate(&db, &id, &type_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "restaurant": RestaurantResponse::from(restaurant)
    })))
}

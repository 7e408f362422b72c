use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use crate::{database::MongoDB, services::auth_service};
use crate::middleware::auth::{claims_from_header, Claims};
use crate::models::UserInfo;
use crate::services::auth_service::{AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, VerifyTokenResponse};

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {} ({})", request.email, response.user.role);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Customer account created", body = AuthResponse),
        (status = 400, description = "Invalid email, username or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", request.email);
            HttpResponse::Created().json(response)
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    db: web::Data<MongoDB>,
    request: web::Json<RefreshTokenRequest>,
) -> HttpResponse {
    log::info!("🔄 POST /auth/refresh");

    match auth_service::refresh_token(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Token refreshed for {}", response.user.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Token refresh failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(req: HttpRequest) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match claims_from_header(header) {
        Ok(claims) => HttpResponse::Ok().json(VerifyTokenResponse {
            valid: true,
            user_id: claims.sub,
            role: claims.role,
            exp: claims.exp,
        }),
        Err(e) => {
            log::warn!("❌ Invalid token: {}", e);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "valid": false,
                "error": e.to_string()
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /auth/me - user: {}", claims.sub);

    match auth_service::get_current_user(&db, &claims.sub).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": UserInfo::from(user)
        })),
        Err(e) => e.error_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use actix_web::{http::StatusCode, test, App};
    use mongodb::bson::oid::ObjectId;

    #[actix_web::test]
    async fn test_verify_reports_role() {
        let user = User {
            id: Some(ObjectId::new()),
            email: "admin@aqro.ph".into(),
            password: String::new(),
            username: "admin".into(),
            first_name: None,
            last_name: None,
            role: Role::Admin,
            restaurant_id: None,
            profile_image_url: None,
            is_active: true,
            rebate_balance: 0.0,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        };
        let token = auth_service::generate_jwt(&user).unwrap();

        let app = test::init_service(App::new().route("/verify", web::get().to(verify_token))).await;

        let req = test::TestRequest::get()
            .uri("/verify")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["role"], "admin");

        let req = test::TestRequest::get()
            .uri("/verify")
            .insert_header(("Authorization", "Bearer nope"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

pub use crate::services::auth_service::Claims;
use crate::services::auth_service::{self, TokenKind};
use crate::utils::AppError;

/// Verifies the bearer token and makes its `Claims` available to handlers
/// through `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

/// Extracts and validates an access token from an `Authorization` header value.
pub fn claims_from_header(header: Option<&str>) -> Result<Claims, AppError> {
    let header = header.ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid token format".into()))?;

    let claims = auth_service::verify_token(token)?;
    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("Refresh tokens cannot be used for API access".into()));
    }
    Ok(claims)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match claims_from_header(header) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(e) => {
                log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use actix_web::{http::StatusCode, test as actix_test, web, App, HttpResponse};
    use mongodb::bson::oid::ObjectId;

    fn user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            email: "staff@aqro.ph".into(),
            password: String::new(),
            username: "staff".into(),
            first_name: None,
            last_name: None,
            role,
            restaurant_id: None,
            profile_image_url: None,
            is_active: true,
            rebate_balance: 0.0,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        }
    }

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.role.to_string())
    }

    #[actix_web::test]
    async fn test_protected_scope() {
        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = actix_test::try_call_service(&app, req).await;
        assert_eq!(resp.err().unwrap().as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let token = auth_service::generate_jwt(&user(Role::Staff)).unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, web::Bytes::from_static(b"staff"));
    }

    #[test]
    fn test_header_parsing() {
        assert!(claims_from_header(None).is_err());
        assert!(claims_from_header(Some("Basic abc")).is_err());
        assert!(claims_from_header(Some("Bearer ")).is_err());

        let refresh = auth_service::generate_refresh_token(&user(Role::Customer)).unwrap();
        assert!(claims_from_header(Some(&format!("Bearer {}", refresh))).is_err());

        let access = auth_service::generate_jwt(&user(Role::Customer)).unwrap();
        let claims = claims_from_header(Some(&format!("Bearer {}", access))).unwrap();
        assert_eq!(claims.role, Role::Customer);
    }
}

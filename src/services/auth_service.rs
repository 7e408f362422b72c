use crate::{
    database::{MongoDB, USERS},
    models::{Role, User, UserInfo},
    services::user_service::{self, NewUser},
    utils::{parse_object_id, AppError},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

struct JwtSettings {
    secret: String,
    issuer: String,
    audience: String,
}

lazy_static! {
    static ref JWT: JwtSettings = JwtSettings {
        secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string()),
        issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "aqro-service".to_string()),
        audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "aqro-app".to_string()),
    };
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub email: String,
    pub role: Role,
    pub restaurant_id: Option<String>,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Malformed token subject".into()))
    }

    pub fn restaurant_id(&self) -> Option<ObjectId> {
        self.restaurant_id.as_deref().and_then(|id| ObjectId::parse_str(id).ok())
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Role '{}' cannot perform this action", self.role)))
        }
    }

    /// Admins may act on anyone; everybody else only on themselves.
    pub fn require_self_or_admin(&self, user_id: &ObjectId) -> Result<(), AppError> {
        if self.is_admin() || self.user_id()? == *user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only access your own account".into()))
        }
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub role: Role,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    verify(password, hashed).map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(AppError::InvalidRequest("Invalid email address".into()));
    }
    Ok(email)
}

fn sign(user: &User, kind: TokenKind, ttl: Duration) -> Result<String, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("User has no id".into()))?;
    let now = Utc::now();

    let claims = Claims {
        sub: user_id.to_hex(),
        email: user.email.clone(),
        role: user.role,
        restaurant_id: user.restaurant_id.map(|id| id.to_hex()),
        kind,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: JWT.audience.clone(),
        iss: JWT.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Generate JWT token
pub fn generate_jwt(user: &User) -> Result<String, AppError> {
    sign(user, TokenKind::Access, Duration::hours(24))
}

// Generate refresh token (longer expiry)
pub fn generate_refresh_token(user: &User) -> Result<String, AppError> {
    sign(user, TokenKind::Refresh, Duration::days(30))
}

// Verify JWT token
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT.audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(JWT.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

fn auth_response(user: User) -> Result<AuthResponse, AppError> {
    let token = generate_jwt(&user)?;
    let refresh_token = generate_refresh_token(&user)?;

    Ok(AuthResponse {
        success: true,
        token,
        refresh_token: Some(refresh_token),
        user: UserInfo::from(user),
    })
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>(USERS);
    let email = normalize_email(&request.email)
        .map_err(|_| AppError::Unauthorized("Invalid credentials".into()))?;

    let mut user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is inactive".into()));
    }

    let now = Utc::now().timestamp();
    collection
        .update_one(doc! { "_id": user.id }, doc! { "$set": { "last_login": now } })
        .await?;
    user.last_login = Some(now);

    auth_response(user)
}

/// Self-service sign up. Always creates a customer; staff and admins are
/// created by an admin through the users API.
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
    let user = user_service::insert_user(
        db,
        NewUser {
            email: request.email.clone(),
            password: request.password.clone(),
            username: request.username.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            role: Role::Customer,
            restaurant_id: None,
        },
    )
    .await?;

    auth_response(user)
}

pub async fn refresh_token(db: &MongoDB, request: &RefreshTokenRequest) -> Result<AuthResponse, AppError> {
    let claims = verify_token(&request.refresh_token)?;
    if claims.kind != TokenKind::Refresh {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let user = get_current_user(db, &claims.sub).await?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is inactive".into()));
    }

    auth_response(user)
}

pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<User, AppError> {
    let id = parse_object_id(user_id, "user")?;
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            email: "barista@aqro.ph".into(),
            password: String::new(),
            username: "barista".into(),
            first_name: None,
            last_name: None,
            role,
            restaurant_id: Some(ObjectId::new()),
            profile_image_url: None,
            is_active: true,
            rebate_balance: 0.0,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        }
    }

    #[test]
    fn test_jwt_roundtrip_carries_role_and_restaurant() {
        let user = sample_user(Role::Staff);
        let token = generate_jwt(&user).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.restaurant_id(), user.restaurant_id);
        assert_eq!(claims.user_id().unwrap(), user.id.unwrap());
    }

    #[test]
    fn test_refresh_token_kind() {
        let user = sample_user(Role::Customer);
        let claims = verify_token(&generate_refresh_token(&user).unwrap()).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = generate_jwt(&sample_user(Role::Customer)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(verify_token(&tampered), Err(AppError::Unauthorized(_))));
        assert!(verify_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_role_gates() {
        let user = sample_user(Role::Staff);
        let claims = verify_token(&generate_jwt(&user).unwrap()).unwrap();
        assert!(claims.require_role(&[Role::Staff, Role::Admin]).is_ok());
        assert!(matches!(claims.require_role(&[Role::Admin]), Err(AppError::Forbidden(_))));
        assert!(claims.require_self_or_admin(&user.id.unwrap()).is_ok());
        assert!(claims.require_self_or_admin(&ObjectId::new()).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hashed = bcrypt::hash("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("wrong horse", &hashed).unwrap());
    }

    #[test]
    fn test_password_and_email_validation() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert_eq!(normalize_email(" Ana@AQRO.ph ").unwrap(), "ana@aqro.ph");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@aqro.ph").is_err());
        assert!(normalize_email("ana@localhost").is_err());
    }
}

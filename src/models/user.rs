use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::AppError;

/// Papel do usuário no app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            other => Err(AppError::InvalidRequest(format!("Unknown role '{}'", other))),
        }
    }
}

// User model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password: String, // bcrypt hash
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub restaurant_id: Option<ObjectId>, // only for staff
    pub profile_image_url: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub rebate_balance: f64,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login: Option<i64>,
}

fn default_is_active() -> bool {
    true
}

/// Perfil público do usuário (sem hash de senha)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub restaurant_id: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub rebate_balance: f64,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        UserInfo {
            id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: u.email,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            role: u.role,
            restaurant_id: u.restaurant_id.map(|id| id.to_hex()),
            profile_image_url: u.profile_image_url,
            is_active: u.is_active,
            rebate_balance: u.rebate_balance,
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

/// Request (admin) para criar usuário com qualquer papel
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub restaurant_id: Option<String>,
}

/// Request para atualizar usuário. Campos administrativos são ignorados
/// quando quem edita é o próprio usuário.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub password: Option<String>,
    // admin only
    pub role: Option<Role>,
    pub restaurant_id: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some() || self.restaurant_id.is_some() || self.is_active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_names() {
        assert_eq!("Staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
    }

    #[test]
    fn test_user_info_hides_password() {
        let user = User {
            id: Some(ObjectId::new()),
            email: "ana@aqro.ph".into(),
            password: "$2b$12$hash".into(),
            username: "ana".into(),
            first_name: None,
            last_name: None,
            role: Role::Customer,
            restaurant_id: None,
            profile_image_url: None,
            is_active: true,
            rebate_balance: 15.0,
            created_at: 1,
            updated_at: 1,
            last_login: None,
        };
        let json = serde_json::to_value(UserInfo::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "customer");
        assert_eq!(json["rebate_balance"], 15.0);
    }

    #[test]
    fn test_admin_field_detection() {
        let update = UpdateUserRequest { username: Some("ana".into()), ..Default::default() };
        assert!(!update.touches_admin_fields());
        let update = UpdateUserRequest { is_active: Some(false), ..Default::default() };
        assert!(update.touches_admin_fields());
    }
}

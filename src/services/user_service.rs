use crate::{
    database::{MongoDB, CHAT_HISTORIES, RESTAURANTS, USERS},
    models::{CreateUserRequest, PaginationQuery, Restaurant, Role, UpdateUserRequest, User},
    services::auth_service::{hash_password, normalize_email, validate_password, Claims},
    utils::{conflict_on_duplicate, parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

/// Dados validados para criar um usuário
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub restaurant_id: Option<ObjectId>,
}

/// Staff accounts must point at an existing restaurant; other roles carry none.
fn check_restaurant_binding(role: Role, restaurant_id: Option<ObjectId>) -> Result<Option<ObjectId>, AppError> {
    match (role, restaurant_id) {
        (Role::Staff, None) => Err(AppError::InvalidRequest("Staff accounts require a restaurant_id".into())),
        (Role::Staff, Some(id)) => Ok(Some(id)),
        (_, _) => Ok(None),
    }
}

async fn ensure_restaurant_exists(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    db.collection::<Restaurant>(RESTAURANTS)
        .find_one(doc! { "_id": id })
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Restaurant".into()))
}

pub async fn insert_user(db: &MongoDB, new_user: NewUser) -> Result<User, AppError> {
    let email = normalize_email(&new_user.email)?;
    validate_password(&new_user.password)?;

    let username = new_user.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::InvalidRequest("Username is required".into()));
    }

    let restaurant_id = check_restaurant_binding(new_user.role, new_user.restaurant_id)?;
    if let Some(id) = &restaurant_id {
        ensure_restaurant_exists(db, id).await?;
    }

    let collection = db.collection::<User>(USERS);
    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let now = chrono::Utc::now().timestamp();
    let mut user = User {
        id: None,
        email,
        password: hash_password(&new_user.password)?,
        username,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        role: new_user.role,
        restaurant_id,
        profile_image_url: None,
        is_active: true,
        rebate_balance: 0.0,
        created_at: now,
        updated_at: now,
        last_login: None,
    };

    // Duas inscrições simultâneas passam pelo find_one; o índice único decide
    let result = collection
        .insert_one(&user)
        .await
        .map_err(|e| conflict_on_duplicate(e, "User already exists"))?;
    user.id = result.inserted_id.as_object_id();

    log::info!("👤 User created: {} ({})", user.email, user.role);
    Ok(user)
}

pub async fn create_user(db: &MongoDB, request: CreateUserRequest) -> Result<User, AppError> {
    let restaurant_id = request
        .restaurant_id
        .as_deref()
        .map(|id| parse_object_id(id, "restaurant"))
        .transpose()?;

    insert_user(
        db,
        NewUser {
            email: request.email,
            password: request.password,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            role: request.role,
            restaurant_id,
        },
    )
    .await
}

pub async fn list_users(db: &MongoDB, role: Option<Role>, page: &PaginationQuery) -> Result<(Vec<User>, u64), AppError> {
    let collection = db.collection::<User>(USERS);
    let filter = match role {
        Some(role) => doc! { "role": role.as_str() },
        None => doc! {},
    };

    let total = collection.count_documents(filter.clone()).await?;
    let users = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(page.offset())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    Ok((users, total))
}

pub async fn get_user(db: &MongoDB, id: &ObjectId) -> Result<User, AppError> {
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))
}

/// Builds the `$set` document for an update, enforcing who may touch what.
fn build_update(
    caller: &Claims,
    existing: &User,
    request: &UpdateUserRequest,
    now: i64,
) -> Result<(Document, Option<ObjectId>), AppError> {
    if request.touches_admin_fields() && !caller.is_admin() {
        return Err(AppError::Forbidden("Only admins can change role, restaurant or status".into()));
    }

    let mut update = doc! { "updated_at": now };

    if let Some(username) = &request.username {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidRequest("Username cannot be empty".into()));
        }
        update.insert("username", username);
    }
    if let Some(first_name) = &request.first_name {
        update.insert("first_name", first_name);
    }
    if let Some(last_name) = &request.last_name {
        update.insert("last_name", last_name);
    }
    if let Some(url) = &request.profile_image_url {
        update.insert("profile_image_url", url);
    }
    if let Some(password) = &request.password {
        validate_password(password)?;
        update.insert("password", hash_password(password)?);
    }
    if let Some(is_active) = request.is_active {
        update.insert("is_active", is_active);
    }

    let mut restaurant_to_check = None;
    if request.role.is_some() || request.restaurant_id.is_some() {
        let role = request.role.unwrap_or(existing.role);
        let requested = request
            .restaurant_id
            .as_deref()
            .map(|id| parse_object_id(id, "restaurant"))
            .transpose()?;
        let restaurant_id = check_restaurant_binding(role, requested.or(existing.restaurant_id))?;

        update.insert("role", role.as_str());
        update.insert("restaurant_id", restaurant_id);
        if requested.is_some() {
            restaurant_to_check = restaurant_id;
        }
    }

    Ok((update, restaurant_to_check))
}

pub async fn update_user(
    db: &MongoDB,
    caller: &Claims,
    id: &ObjectId,
    request: &UpdateUserRequest,
) -> Result<User, AppError> {
    caller.require_self_or_admin(id)?;

    let existing = get_user(db, id).await?;
    let now = chrono::Utc::now().timestamp();
    let (update, restaurant_to_check) = build_update(caller, &existing, request, now)?;

    if let Some(restaurant_id) = &restaurant_to_check {
        ensure_restaurant_exists(db, restaurant_id).await?;
    }

    db.collection::<User>(USERS)
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await?;

    get_user(db, id).await
}

pub async fn delete_user(db: &MongoDB, caller: &Claims, id: &ObjectId) -> Result<(), AppError> {
    caller.require_role(&[Role::Admin])?;
    if caller.user_id()? == *id {
        return Err(AppError::InvalidRequest("Admins cannot delete their own account".into()));
    }

    let result = db
        .collection::<User>(USERS)
        .delete_one(doc! { "_id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("User".into()));
    }

    db.collection::<Document>(CHAT_HISTORIES)
        .delete_many(doc! { "user_id": id })
        .await?;

    log::info!("🗑️  User deleted: {}", id.to_hex());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::TokenKind;

    fn claims(role: Role, sub: ObjectId) -> Claims {
        Claims {
            sub: sub.to_hex(),
            email: "x@aqro.ph".into(),
            role,
            restaurant_id: None,
            kind: TokenKind::Access,
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        }
    }

    fn customer(id: ObjectId) -> User {
        User {
            id: Some(id),
            email: "ana@aqro.ph".into(),
            password: "hash".into(),
            username: "ana".into(),
            first_name: None,
            last_name: None,
            role: Role::Customer,
            restaurant_id: None,
            profile_image_url: None,
            is_active: true,
            rebate_balance: 0.0,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        }
    }

    #[test]
    fn test_staff_requires_restaurant() {
        assert!(check_restaurant_binding(Role::Staff, None).is_err());
        let shop = ObjectId::new();
        assert_eq!(check_restaurant_binding(Role::Staff, Some(shop)).unwrap(), Some(shop));
        assert_eq!(check_restaurant_binding(Role::Customer, Some(shop)).unwrap(), None);
    }

    #[test]
    fn test_customer_cannot_promote_self() {
        let id = ObjectId::new();
        let request = UpdateUserRequest { role: Some(Role::Admin), ..Default::default() };
        let err = build_update(&claims(Role::Customer, id), &customer(id), &request, 5).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_profile_update_fields() {
        let id = ObjectId::new();
        let request = UpdateUserRequest {
            username: Some("  ana b ".into()),
            first_name: Some("Ana".into()),
            ..Default::default()
        };
        let (update, check) = build_update(&claims(Role::Customer, id), &customer(id), &request, 5).unwrap();
        assert_eq!(update.get_str("username").unwrap(), "ana b");
        assert_eq!(update.get_str("first_name").unwrap(), "Ana");
        assert_eq!(update.get_i64("updated_at").unwrap(), 5);
        assert!(!update.contains_key("role"));
        assert!(check.is_none());
    }

    #[test]
    fn test_admin_turns_customer_into_staff() {
        let id = ObjectId::new();
        let shop = ObjectId::new();
        let request = UpdateUserRequest {
            role: Some(Role::Staff),
            restaurant_id: Some(shop.to_hex()),
            ..Default::default()
        };
        let (update, check) = build_update(&claims(Role::Admin, ObjectId::new()), &customer(id), &request, 5).unwrap();
        assert_eq!(update.get_str("role").unwrap(), "staff");
        assert_eq!(update.get_object_id("restaurant_id").unwrap(), shop);
        assert_eq!(check, Some(shop));

        let missing = UpdateUserRequest { role: Some(Role::Staff), ..Default::default() };
        assert!(build_update(&claims(Role::Admin, ObjectId::new()), &customer(id), &missing, 5).is_err());
    }
}

use crate::config::AppConfig;
use crate::database::{MongoDB, CONTAINER_TYPES, USERS};
use crate::models::{ContainerType, Role, User};
use crate::services::user_service::{self, NewUser};
use mongodb::bson::doc;

/// Seed dos tipos de container padrão.
/// Só insere se a collection estiver vazia.
pub async fn seed_default_container_types(db: &MongoDB) {
    let collection = db.collection::<ContainerType>(CONTAINER_TYPES);

    let count = collection.count_documents(doc! {}).await.unwrap_or(0);
    if count > 0 {
        log::info!("🥤 Container types: {} already in DB, skipping seed", count);
        return;
    }

    let now = chrono::Utc::now().timestamp();
    let types = build_default_container_types(now);
    log::info!("🥤 Container types: seeding {} defaults...", types.len());

    match collection.insert_many(&types).await {
        Ok(result) => {
            log::info!("   ✅ Inserted {} default container types", result.inserted_ids.len());
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed container types: {}", e);
        }
    }
}

fn build_default_container_types(now: i64) -> Vec<ContainerType> {
    let make = |name: &str, description: &str, price: f64, max_uses: u32| ContainerType {
        id: None,
        name: name.into(),
        description: Some(description.into()),
        price,
        max_uses,
        image_url: None,
        created_at: now,
        updated_at: now,
    };

    vec![
        make("Cup 12oz", "Reusable cup for regular-size drinks", 120.0, 10),
        make("Cup 16oz", "Reusable cup for large drinks", 150.0, 10),
        make("Food Box", "Reusable meal container", 200.0, 8),
    ]
}

/// Cria o admin inicial a partir de ADMIN_EMAIL/ADMIN_PASSWORD, se ainda não existir nenhum admin.
pub async fn seed_admin(db: &MongoDB, config: &AppConfig) {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        log::info!("👑 Bootstrap admin: ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping");
        return;
    };

    let admins = db
        .collection::<User>(USERS)
        .count_documents(doc! { "role": Role::Admin.as_str() })
        .await
        .unwrap_or(0);
    if admins > 0 {
        log::info!("👑 Bootstrap admin: {} admin(s) already exist, skipping", admins);
        return;
    }

    let new_admin = NewUser {
        email: email.clone(),
        password: password.clone(),
        username: "admin".into(),
        first_name: None,
        last_name: None,
        role: Role::Admin,
        restaurant_id: None,
    };

    match user_service::insert_user(db, new_admin).await {
        Ok(user) => log::info!("   ✅ Bootstrap admin created: {}", user.email),
        Err(e) => log::error!("   ❌ Failed to create bootstrap admin: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_types() {
        let types = build_default_container_types(42);
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Cup 12oz", "Cup 16oz", "Food Box"]);
        assert!(types.iter().all(|t| t.max_uses >= 1 && t.price > 0.0 && t.created_at == 42));
    }
}

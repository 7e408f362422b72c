pub mod store;

pub use store::LifecycleStore;

use mongodb::{options::IndexOptions, Client, Collection, Database, IndexModel};
use std::error::Error;

pub const RESTAURANTS: &str = "restaurants";
pub const CONTAINER_TYPES: &str = "container_types";
pub const CONTAINERS: &str = "containers";
pub const USERS: &str = "users";
pub const ACTIVITIES: &str = "activities";
pub const CHAT_HISTORIES: &str = "chat_histories";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name(uri);
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the lifecycle and listing queries rely on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;

        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, IndexModel, &str)> = vec![
            (
                CONTAINERS,
                IndexModel::builder().keys(doc! { "qr_code": 1 }).options(unique()).build(),
                "containers(qr_code) unique",
            ),
            (
                CONTAINERS,
                IndexModel::builder().keys(doc! { "customer_id": 1, "status": 1 }).build(),
                "containers(customer_id, status)",
            ),
            (
                CONTAINERS,
                IndexModel::builder().keys(doc! { "status": 1, "last_used_at": 1 }).build(),
                "containers(status, last_used_at)",
            ),
            (
                USERS,
                IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                "users(email) unique",
            ),
            (
                CONTAINER_TYPES,
                IndexModel::builder().keys(doc! { "name": 1 }).options(unique()).build(),
                "container_types(name) unique",
            ),
            (
                ACTIVITIES,
                IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build(),
                "activities(user_id, created_at)",
            ),
            (
                ACTIVITIES,
                IndexModel::builder().keys(doc! { "restaurant_id": 1, "created_at": -1 }).build(),
                "activities(restaurant_id, created_at)",
            ),
            (
                CHAT_HISTORIES,
                IndexModel::builder().keys(doc! { "user_id": 1 }).options(unique()).build(),
                "chat_histories(user_id) unique",
            ),
        ];

        for (collection, index, label) in indexes {
            let collection = self.db.collection::<mongodb::bson::Document>(collection);
            match collection.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {} ({})", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Check if the connection is healthy
    pub async fn ping(&self) -> bool {
        self.db
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}

/// Extract database name from URI or use default
fn database_name(uri: &str) -> &str {
    uri.rsplit('/')
        .next()
        .and_then(|s| s.split('?').next())
        .filter(|s| !s.is_empty() && !s.contains([':', '@', '.']))
        .unwrap_or("aqro")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name("mongodb://localhost:27017/aqro_dev"), "aqro_dev");
        assert_eq!(database_name("mongodb+srv://u:p@cluster.net/prod?retryWrites=true"), "prod");
        assert_eq!(database_name("mongodb://localhost:27017"), "aqro");
        assert_eq!(database_name("mongodb://localhost:27017/"), "aqro");
        assert_eq!(database_name("mongodb://db.internal"), "aqro");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aqro_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}

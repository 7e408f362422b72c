use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

use super::{MongoDB, ACTIVITIES, CONTAINERS, CONTAINER_TYPES, RESTAURANTS, USERS};
use crate::models::{Activity, Container, ContainerStatus, ContainerType, Restaurant};
use crate::utils::AppError;

/// Storage seam for the container lifecycle.
///
/// The lifecycle service only talks to this trait, so the rebate and
/// registration flows run the same against MongoDB and the in-memory
/// store used by the tests.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    async fn container_by_qr(&self, qr_code: &str) -> Result<Option<Container>, AppError>;

    async fn container_by_id(&self, id: &ObjectId) -> Result<Option<Container>, AppError>;

    async fn container_type(&self, id: &ObjectId) -> Result<Option<ContainerType>, AppError>;

    async fn restaurant(&self, id: &ObjectId) -> Result<Option<Restaurant>, AppError>;

    /// Inserts new containers, filling in their ids.
    async fn insert_containers(&self, containers: &mut [Container]) -> Result<(), AppError>;

    /// Saves the container only if nobody else saved it since it was read.
    /// Bumps `version` on success; fails with `Conflict` otherwise.
    async fn save_container(&self, container: &mut Container) -> Result<(), AppError>;

    async fn credit_customer(&self, customer_id: &ObjectId, amount: f64, now: i64) -> Result<(), AppError>;

    async fn record_activity(&self, activity: Activity) -> Result<(), AppError>;

    /// Active containers whose last use (or registration) is before `cutoff`.
    async fn stale_active_containers(&self, cutoff: i64) -> Result<Vec<Container>, AppError>;
}

fn version_filter(id: ObjectId, expected: i64) -> Document {
    if expected == 0 {
        // Documentos antigos podem não ter o campo `version`
        doc! {
            "_id": id,
            "$or": [ { "version": 0_i64 }, { "version": { "$exists": false } } ]
        }
    } else {
        doc! { "_id": id, "version": expected }
    }
}

#[async_trait]
impl LifecycleStore for MongoDB {
    async fn container_by_qr(&self, qr_code: &str) -> Result<Option<Container>, AppError> {
        Ok(self
            .collection::<Container>(CONTAINERS)
            .find_one(doc! { "qr_code": qr_code })
            .await?)
    }

    async fn container_by_id(&self, id: &ObjectId) -> Result<Option<Container>, AppError> {
        Ok(self
            .collection::<Container>(CONTAINERS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn container_type(&self, id: &ObjectId) -> Result<Option<ContainerType>, AppError> {
        Ok(self
            .collection::<ContainerType>(CONTAINER_TYPES)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn restaurant(&self, id: &ObjectId) -> Result<Option<Restaurant>, AppError> {
        Ok(self
            .collection::<Restaurant>(RESTAURANTS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn insert_containers(&self, containers: &mut [Container]) -> Result<(), AppError> {
        if containers.is_empty() {
            return Ok(());
        }

        let result = self
            .collection::<Container>(CONTAINERS)
            .insert_many(containers.iter())
            .await?;

        for (index, id) in result.inserted_ids {
            if let (Some(container), Some(oid)) = (containers.get_mut(index), id.as_object_id()) {
                container.id = Some(oid);
            }
        }
        Ok(())
    }

    async fn save_container(&self, container: &mut Container) -> Result<(), AppError> {
        let id = container
            .id
            .ok_or_else(|| AppError::Internal("Cannot save a container without id".into()))?;
        let expected = container.version;

        container.version = expected + 1;
        let result = self
            .collection::<Container>(CONTAINERS)
            .replace_one(version_filter(id, expected), &*container)
            .await;

        match result {
            Ok(r) if r.matched_count == 1 => Ok(()),
            Ok(_) => {
                container.version = expected;
                Err(AppError::Conflict(
                    "Container was modified by another request, please retry".into(),
                ))
            }
            Err(e) => {
                container.version = expected;
                Err(e.into())
            }
        }
    }

    async fn credit_customer(&self, customer_id: &ObjectId, amount: f64, now: i64) -> Result<(), AppError> {
        let result = self
            .collection::<Document>(USERS)
            .update_one(
                doc! { "_id": customer_id },
                doc! {
                    "$inc": { "rebate_balance": amount },
                    "$set": { "updated_at": now }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound("Customer".into()));
        }
        Ok(())
    }

    async fn record_activity(&self, activity: Activity) -> Result<(), AppError> {
        self.collection::<Activity>(ACTIVITIES)
            .insert_one(&activity)
            .await?;
        Ok(())
    }

    async fn stale_active_containers(&self, cutoff: i64) -> Result<Vec<Container>, AppError> {
        let filter = doc! {
            "status": ContainerStatus::Active.as_str(),
            "$or": [
                { "last_used_at": { "$lt": cutoff } },
                { "last_used_at": null, "registered_at": { "$lt": cutoff } }
            ]
        };

        let cursor = self.collection::<Container>(CONTAINERS).find(filter).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory `LifecycleStore` for service tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryStore {
        pub containers: Mutex<Vec<Container>>,
        pub types: Mutex<Vec<ContainerType>>,
        pub restaurants: Mutex<Vec<Restaurant>>,
        pub balances: Mutex<HashMap<ObjectId, f64>>,
        pub activities: Mutex<Vec<Activity>>,
        /// Makes `record_activity` fail, to exercise partial-write paths.
        pub fail_activities: AtomicBool,
    }

    impl MemoryStore {
        pub fn add_customer(&self, id: ObjectId) {
            self.balances.lock().unwrap().insert(id, 0.0);
        }

        pub fn balance(&self, id: &ObjectId) -> f64 {
            self.balances.lock().unwrap().get(id).copied().unwrap_or_default()
        }

        pub fn container(&self, qr_code: &str) -> Container {
            self.containers
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.qr_code == qr_code)
                .cloned()
                .expect("container in store")
        }
    }

    #[async_trait]
    impl LifecycleStore for MemoryStore {
        async fn container_by_qr(&self, qr_code: &str) -> Result<Option<Container>, AppError> {
            Ok(self.containers.lock().unwrap().iter().find(|c| c.qr_code == qr_code).cloned())
        }

        async fn container_by_id(&self, id: &ObjectId) -> Result<Option<Container>, AppError> {
            Ok(self.containers.lock().unwrap().iter().find(|c| c.id.as_ref() == Some(id)).cloned())
        }

        async fn container_type(&self, id: &ObjectId) -> Result<Option<ContainerType>, AppError> {
            Ok(self.types.lock().unwrap().iter().find(|t| t.id.as_ref() == Some(id)).cloned())
        }

        async fn restaurant(&self, id: &ObjectId) -> Result<Option<Restaurant>, AppError> {
            Ok(self.restaurants.lock().unwrap().iter().find(|r| r.id.as_ref() == Some(id)).cloned())
        }

        async fn insert_containers(&self, containers: &mut [Container]) -> Result<(), AppError> {
            let mut stored = self.containers.lock().unwrap();
            for container in containers.iter_mut() {
                if stored.iter().any(|c| c.qr_code == container.qr_code) {
                    return Err(AppError::Conflict("Duplicate QR code".into()));
                }
                container.id = Some(ObjectId::new());
                stored.push(container.clone());
            }
            Ok(())
        }

        async fn save_container(&self, container: &mut Container) -> Result<(), AppError> {
            let mut stored = self.containers.lock().unwrap();
            let slot = stored
                .iter_mut()
                .find(|c| c.id == container.id)
                .ok_or_else(|| AppError::NotFound("Container".into()))?;
            if slot.version != container.version {
                return Err(AppError::Conflict(
                    "Container was modified by another request, please retry".into(),
                ));
            }
            container.version += 1;
            *slot = container.clone();
            Ok(())
        }

        async fn credit_customer(&self, customer_id: &ObjectId, amount: f64, _now: i64) -> Result<(), AppError> {
            let mut balances = self.balances.lock().unwrap();
            let balance = balances
                .get_mut(customer_id)
                .ok_or_else(|| AppError::NotFound("Customer".into()))?;
            *balance += amount;
            Ok(())
        }

        async fn record_activity(&self, activity: Activity) -> Result<(), AppError> {
            if self.fail_activities.load(Ordering::SeqCst) {
                return Err(AppError::DatabaseError("activities unavailable".into()));
            }
            self.activities.lock().unwrap().push(activity);
            Ok(())
        }

        async fn stale_active_containers(&self, cutoff: i64) -> Result<Vec<Container>, AppError> {
            Ok(self
                .containers
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.status == ContainerStatus::Active)
                .filter(|c| match c.last_used_at {
                    Some(used) => used < cutoff,
                    None => c.registered_at.is_some_and(|registered| registered < cutoff),
                })
                .cloned()
                .collect())
        }
    }
}

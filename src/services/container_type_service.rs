use crate::{
    database::{MongoDB, CONTAINERS, CONTAINER_TYPES, RESTAURANTS},
    models::{round_money, ContainerType, CreateContainerTypeRequest, UpdateContainerTypeRequest},
    utils::{conflict_on_duplicate, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

fn validate_fields(name: Option<&str>, price: Option<f64>, max_uses: Option<u32>) -> Result<(), AppError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Name is required".into()));
        }
    }
    if let Some(price) = price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::InvalidRequest("Price must be zero or positive".into()));
        }
    }
    if max_uses == Some(0) {
        return Err(AppError::InvalidRequest("max_uses must be at least 1".into()));
    }
    Ok(())
}

async fn ensure_unique_name(db: &MongoDB, name: &str, except: Option<&ObjectId>) -> Result<(), AppError> {
    let mut filter = doc! { "name": name };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    let taken = db
        .collection::<ContainerType>(CONTAINER_TYPES)
        .find_one(filter)
        .await?
        .is_some();
    if taken {
        return Err(AppError::Conflict(format!("Container type '{}' already exists", name)));
    }
    Ok(())
}

pub async fn list_container_types(db: &MongoDB) -> Result<Vec<ContainerType>, AppError> {
    let types = db
        .collection::<ContainerType>(CONTAINER_TYPES)
        .find(doc! {})
        .sort(doc! { "name": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(types)
}

pub async fn get_container_type(db: &MongoDB, id: &ObjectId) -> Result<ContainerType, AppError> {
    db.collection::<ContainerType>(CONTAINER_TYPES)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("Container type".into()))
}

pub async fn create_container_type(db: &MongoDB, request: CreateContainerTypeRequest) -> Result<ContainerType, AppError> {
    validate_fields(Some(&request.name), Some(request.price), Some(request.max_uses))?;
    let name = request.name.trim().to_string();
    ensure_unique_name(db, &name, None).await?;

    let now = chrono::Utc::now().timestamp();
    let mut container_type = ContainerType {
        id: None,
        name,
        description: request.description,
        price: round_money(request.price),
        max_uses: request.max_uses,
        image_url: request.image_url,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<ContainerType>(CONTAINER_TYPES)
        .insert_one(&container_type)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Container type name already exists"))?;
    container_type.id = result.inserted_id.as_object_id();

    log::info!("🥤 Container type created: {}", container_type.name);
    Ok(container_type)
}

/// Updates a type. A new `max_uses` only applies to containers registered afterwards.
pub async fn update_container_type(
    db: &MongoDB,
    id: &ObjectId,
    request: &UpdateContainerTypeRequest,
) -> Result<ContainerType, AppError> {
    validate_fields(request.name.as_deref(), request.price, request.max_uses)?;

    let mut update = doc! { "updated_at": chrono::Utc::now().timestamp() };
    if let Some(name) = &request.name {
        let name = name.trim();
        ensure_unique_name(db, name, Some(id)).await?;
        update.insert("name", name);
    }
    if let Some(description) = &request.description {
        update.insert("description", description);
    }
    if let Some(price) = request.price {
        update.insert("price", round_money(price));
    }
    if let Some(max_uses) = request.max_uses {
        update.insert("max_uses", max_uses as i64);
    }
    if let Some(image_url) = &request.image_url {
        update.insert("image_url", image_url);
    }

    let result = db
        .collection::<ContainerType>(CONTAINER_TYPES)
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await
        .map_err(|e| conflict_on_duplicate(e, "Container type name already exists"))?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Container type".into()));
    }

    get_container_type(db, id).await
}

/// Deletes a type that no container uses, and drops it from every rebate table.
pub async fn delete_container_type(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    let in_use = db
        .collection::<Document>(CONTAINERS)
        .count_documents(doc! { "container_type_id": id })
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Container type is used by {} container(s)",
            in_use
        )));
    }

    let result = db
        .collection::<ContainerType>(CONTAINER_TYPES)
        .delete_one(doc! { "_id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Container type".into()));
    }

    db.collection::<Document>(RESTAURANTS)
        .update_many(
            doc! { "rebates.container_type_id": id },
            doc! { "$pull": { "rebates": { "container_type_id": id } } },
        )
        .await?;

    log::info!("🗑️  Container type deleted: {}", id.to_hex());
    Ok(())
}

use crate::{
    database::{MongoDB, CONTAINER_TYPES, RESTAURANTS, USERS},
    models::{
        round_money, ContainerType, CreateRestaurantRequest, RebateRate, RebateRateInput,
        Restaurant, Role, UpdateRestaurantRequest,
    },
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn validate_amount(amount: f64) -> Result<f64, AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidRequest("Rebate amount must be zero or positive".into()));
    }
    Ok(round_money(amount))
}

async fn ensure_container_type(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    db.collection::<ContainerType>(CONTAINER_TYPES)
        .find_one(doc! { "_id": id })
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Container type {}", id.to_hex())))
}

/// Validates a rebate table: known types, non-negative amounts, no duplicates.
async fn resolve_rates(db: &MongoDB, inputs: &[RebateRateInput]) -> Result<Vec<RebateRate>, AppError> {
    let mut rates: Vec<RebateRate> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let container_type_id = parse_object_id(&input.container_type_id, "container type")?;
        if rates.iter().any(|r| r.container_type_id == container_type_id) {
            return Err(AppError::InvalidRequest(format!(
                "Duplicate rebate for container type {}",
                input.container_type_id
            )));
        }
        ensure_container_type(db, &container_type_id).await?;
        rates.push(RebateRate {
            container_type_id,
            amount: validate_amount(input.amount)?,
        });
    }
    Ok(rates)
}

pub async fn list_restaurants(db: &MongoDB, active: Option<bool>) -> Result<Vec<Restaurant>, AppError> {
    let filter = match active {
        Some(is_active) => doc! { "is_active": is_active },
        None => doc! {},
    };

    let restaurants = db
        .collection::<Restaurant>(RESTAURANTS)
        .find(filter)
        .sort(doc! { "name": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(restaurants)
}

pub async fn get_restaurant(db: &MongoDB, id: &ObjectId) -> Result<Restaurant, AppError> {
    db.collection::<Restaurant>(RESTAURANTS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant".into()))
}

pub async fn create_restaurant(db: &MongoDB, request: CreateRestaurantRequest) -> Result<Restaurant, AppError> {
    let now = chrono::Utc::now().timestamp();
    let mut restaurant = Restaurant {
        id: None,
        name: required(&request.name, "Name")?,
        location: required(&request.location, "Location")?,
        contact_number: request.contact_number,
        email: request.email,
        logo_url: request.logo_url,
        is_active: true,
        rebates: resolve_rates(db, &request.rebates).await?,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Restaurant>(RESTAURANTS)
        .insert_one(&restaurant)
        .await?;
    restaurant.id = result.inserted_id.as_object_id();

    log::info!("🏪 Restaurant created: {}", restaurant.name);
    Ok(restaurant)
}

pub async fn update_restaurant(
    db: &MongoDB,
    id: &ObjectId,
    request: &UpdateRestaurantRequest,
) -> Result<Restaurant, AppError> {
    let mut update = doc! { "updated_at": chrono::Utc::now().timestamp() };

    if let Some(name) = &request.name {
        update.insert("name", required(name, "Name")?);
    }
    if let Some(location) = &request.location {
        update.insert("location", required(location, "Location")?);
    }
    if let Some(contact) = &request.contact_number {
        update.insert("contact_number", contact);
    }
    if let Some(email) = &request.email {
        update.insert("email", email);
    }
    if let Some(logo) = &request.logo_url {
        update.insert("logo_url", logo);
    }
    if let Some(is_active) = request.is_active {
        update.insert("is_active", is_active);
    }

    let result = db
        .collection::<Restaurant>(RESTAURANTS)
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Restaurant".into()));
    }

    get_restaurant(db, id).await
}

/// Deletes a restaurant. Staff still attached to it must be reassigned first.
pub async fn delete_restaurant(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    let staff = db
        .collection::<Document>(USERS)
        .count_documents(doc! { "restaurant_id": id, "role": Role::Staff.as_str() })
        .await?;
    if staff > 0 {
        return Err(AppError::Conflict(format!(
            "Restaurant still has {} staff account(s)",
            staff
        )));
    }

    let result = db
        .collection::<Restaurant>(RESTAURANTS)
        .delete_one(doc! { "_id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Restaurant".into()));
    }

    log::info!("🗑️  Restaurant deleted: {}", id.to_hex());
    Ok(())
}

/// Atomic updates for one rate in the embedded rebate table. Returns the
/// (filter, update) pairs for "replace existing rate" and "append new rate".
fn rebate_upsert_updates(id: &ObjectId, container_type_id: &ObjectId, amount: f64, now: i64) -> [(Document, Document); 2] {
    [
        (
            doc! { "_id": id, "rebates.container_type_id": container_type_id },
            doc! { "$set": { "rebates.$.amount": amount, "updated_at": now } },
        ),
        (
            doc! { "_id": id, "rebates.container_type_id": { "$ne": container_type_id } },
            doc! {
                "$push": { "rebates": { "container_type_id": container_type_id, "amount": amount } },
                "$set": { "updated_at": now }
            },
        ),
    ]
}

/// Inserts or replaces the rebate paid for one container type.
pub async fn set_rebate(db: &MongoDB, id: &ObjectId, input: &RebateRateInput) -> Result<Restaurant, AppError> {
    let container_type_id = parse_object_id(&input.container_type_id, "container type")?;
    let amount = validate_amount(input.amount)?;
    ensure_container_type(db, &container_type_id).await?;

    let collection = db.collection::<Restaurant>(RESTAURANTS);
    let now = chrono::Utc::now().timestamp();

    // Se outro request inserir o mesmo tipo entre as duas tentativas, a
    // segunda rodada cai no `$set` posicional
    let mut applied = false;
    'attempts: for _ in 0..2 {
        for (filter, update) in rebate_upsert_updates(id, &container_type_id, amount, now) {
            if collection.update_one(filter, update).await?.matched_count == 1 {
                applied = true;
                break 'attempts;
            }
        }
    }
    if !applied {
        return Err(AppError::NotFound("Restaurant".into()));
    }

    log::info!(
        "💰 Rebate set: restaurant={} type={} amount={:.2}",
        id.to_hex(),
        container_type_id.to_hex(),
        amount
    );
    get_restaurant(db, id).await
}

fn rebate_removal(id: &ObjectId, container_type_id: &ObjectId, now: i64) -> (Document, Document) {
    (
        doc! { "_id": id, "rebates.container_type_id": container_type_id },
        doc! {
            "$pull": { "rebates": { "container_type_id": container_type_id } },
            "$set": { "updated_at": now }
        },
    )
}

pub async fn remove_rebate(db: &MongoDB, id: &ObjectId, container_type_id: &ObjectId) -> Result<Restaurant, AppError> {
    let (filter, update) = rebate_removal(id, container_type_id, chrono::Utc::now().timestamp());
    let result = db
        .collection::<Restaurant>(RESTAURANTS)
        .update_one(filter, update)
        .await?;

    if result.matched_count == 0 {
        // Distingue restaurante inexistente de rebate inexistente
        get_restaurant(db, id).await?;
        return Err(AppError::NotFound("Rebate for this container type".into()));
    }
    get_restaurant(db, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Kape Tayo ", "Name").unwrap(), "Kape Tayo");
        assert!(required("   ", "Name").is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(4.999).unwrap(), 5.0);
        assert_eq!(validate_amount(0.0).unwrap(), 0.0);
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }

    #[test]
    fn test_rebate_upsert_is_positional() {
        let id = ObjectId::new();
        let cup = ObjectId::new();
        let [(replace_filter, replace), (push_filter, push)] = rebate_upsert_updates(&id, &cup, 6.5, 10);

        assert_eq!(replace_filter.get_object_id("rebates.container_type_id").unwrap(), cup);
        let set = replace.get_document("$set").unwrap();
        assert_eq!(set.get_f64("rebates.$.amount").unwrap(), 6.5);
        assert!(!replace.contains_key("$push"));

        let ne = push_filter.get_document("rebates.container_type_id").unwrap();
        assert_eq!(ne.get_object_id("$ne").unwrap(), cup);
        let pushed = push.get_document("$push").unwrap().get_document("rebates").unwrap();
        assert_eq!(pushed.get_object_id("container_type_id").unwrap(), cup);
        assert_eq!(pushed.get_f64("amount").unwrap(), 6.5);
    }

    #[test]
    fn test_rebate_removal_pulls_one_type() {
        let id = ObjectId::new();
        let cup = ObjectId::new();
        let (filter, update) = rebate_removal(&id, &cup, 10);

        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        let pull = update.get_document("$pull").unwrap().get_document("rebates").unwrap();
        assert_eq!(pull.get_object_id("container_type_id").unwrap(), cup);
        assert_eq!(update.get_document("$set").unwrap().get_i64("updated_at").unwrap(), 10);
    }
}

use crate::{
    database::{LifecycleStore, MongoDB, CONTAINERS},
    models::{
        Activity, ActivityKind, Container, ContainerStats, ContainerStatus, PaginationQuery,
        RebateReceipt, Role,
    },
    services::auth_service::Claims,
    utils::{parse_object_id, qr, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

pub const MAX_BATCH: u32 = 100;

fn normalized_qr(raw: &str) -> Result<String, AppError> {
    qr::normalize_qr_code(raw).ok_or_else(|| AppError::InvalidRequest("Unrecognized QR code".into()))
}

/// Generates a batch of available containers with fresh QR codes (admin).
pub async fn generate_containers<S: LifecycleStore + ?Sized>(
    store: &S,
    admin_id: ObjectId,
    container_type_id: &ObjectId,
    quantity: u32,
) -> Result<Vec<Container>, AppError> {
    if quantity == 0 || quantity > MAX_BATCH {
        return Err(AppError::InvalidRequest(format!(
            "Quantity must be between 1 and {}",
            MAX_BATCH
        )));
    }

    let container_type = store
        .container_type(container_type_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Container type".into()))?;

    let now = chrono::Utc::now().timestamp();
    let mut containers = (0..quantity)
        .map(|_| Container::new(qr::generate_qr_code(), &container_type, now))
        .collect::<Result<Vec<_>, _>>()?;

    store.insert_containers(&mut containers).await?;

    store
        .record_activity(
            Activity::new(admin_id, ActivityKind::ContainerCreated, now)
                .notes(Some(format!("Generated {} x {}", quantity, container_type.name))),
        )
        .await?;

    log::info!("📦 Generated {} container(s) of type {}", quantity, container_type.name);
    Ok(containers)
}

/// Customer scans an available container and takes ownership of it.
pub async fn register_container<S: LifecycleStore + ?Sized>(
    store: &S,
    customer_id: ObjectId,
    qr_code: &str,
) -> Result<Container, AppError> {
    let qr_code = normalized_qr(qr_code)?;
    let mut container = store
        .container_by_qr(&qr_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Container".into()))?;

    let container_type = store
        .container_type(&container.container_type_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Container type".into()))?;

    let now = chrono::Utc::now().timestamp();
    container.register_to(customer_id, container_type.max_uses, now)?;
    store.save_container(&mut container).await?;

    store
        .record_activity(
            Activity::new(customer_id, ActivityKind::Registration, now)
                .container(container.id, container.status),
        )
        .await?;

    log::info!("✅ Container {} registered to {}", container.qr_code, customer_id.to_hex());
    Ok(container)
}

/// Resolves which restaurant pays the rebate: staff are pinned to their own.
fn rebate_restaurant(caller: &Claims, requested: Option<&str>) -> Result<ObjectId, AppError> {
    let requested = requested.map(|id| parse_object_id(id, "restaurant")).transpose()?;

    match caller.role {
        Role::Staff => {
            let own = caller
                .restaurant_id()
                .ok_or_else(|| AppError::Forbidden("Staff account is not linked to a restaurant".into()))?;
            match requested {
                Some(other) if other != own => Err(AppError::Forbidden(
                    "Staff can only process rebates for their own restaurant".into(),
                )),
                _ => Ok(own),
            }
        }
        Role::Admin => requested.ok_or_else(|| AppError::InvalidRequest("restaurant_id is required".into())),
        Role::Customer => Err(AppError::Forbidden("Customers cannot process rebates".into())),
    }
}

/// Staff scans a returned container: consume one use, pay the restaurant's
/// rate for its type to the owner, and log the rebate.
pub async fn process_rebate<S: LifecycleStore + ?Sized>(
    store: &S,
    caller: &Claims,
    qr_code: &str,
    restaurant_id: Option<&str>,
) -> Result<RebateReceipt, AppError> {
    let restaurant_id = rebate_restaurant(caller, restaurant_id)?;
    let qr_code = normalized_qr(qr_code)?;

    let mut container = store
        .container_by_qr(&qr_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Container".into()))?;

    let restaurant = store
        .restaurant(&restaurant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant".into()))?;
    if !restaurant.is_active {
        return Err(AppError::InvalidRequest("Restaurant is not active".into()));
    }

    let amount = restaurant
        .rebate_for(&container.container_type_id)
        .ok_or_else(|| {
            AppError::InvalidRequest("Restaurant has no rebate configured for this container type".into())
        })?;

    let now = chrono::Utc::now().timestamp();
    let completed = container.consume_use(restaurant_id, amount, now)?;
    let customer_id = container
        .customer_id
        .ok_or_else(|| AppError::Internal("Active container without customer".into()))?;

    store.save_container(&mut container).await?;

    if let Err(e) = store.credit_customer(&customer_id, amount, now).await {
        // O container já foi gravado; registra para conciliação manual
        log::error!(
            "❌ Rebate of {:.2} for container {} saved but customer {} was not credited: {}",
            amount,
            container.qr_code,
            customer_id.to_hex(),
            e
        );
        return Err(e);
    }

    // O rebate já foi pago; falha no log não pode gerar um novo scan
    let logged = store
        .record_activity(
            Activity::new(customer_id, ActivityKind::Rebate, now)
                .container(container.id, container.status)
                .restaurant(restaurant_id)
                .amount(amount)
                .notes(Some(format!("Processed by {}", caller.sub))),
        )
        .await;
    if let Err(e) = logged {
        log::error!(
            "❌ Rebate of {:.2} for container {} paid to {} but the activity was not recorded: {}",
            amount,
            container.qr_code,
            customer_id.to_hex(),
            e
        );
    }

    log::info!(
        "💰 Rebate {:.2} paid for {} at {} ({} uses left)",
        amount,
        container.qr_code,
        restaurant.name,
        container.uses_left
    );

    Ok(RebateReceipt {
        customer_id: customer_id.to_hex(),
        restaurant_id: restaurant_id.to_hex(),
        rebate_amount: amount,
        uses_left: container.uses_left,
        completed,
        container: container.into(),
    })
}

/// Manual status change by staff/admin. Moving back to `available` restocks
/// the container for a new customer.
pub async fn update_status<S: LifecycleStore + ?Sized>(
    store: &S,
    actor_id: ObjectId,
    container_id: &ObjectId,
    status: ContainerStatus,
    notes: Option<String>,
) -> Result<Container, AppError> {
    let mut container = store
        .container_by_id(container_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Container".into()))?;
    let previous_owner = container.customer_id;
    let now = chrono::Utc::now().timestamp();

    // Sem dono, só o registro do cliente pode ativar o container
    if status == ContainerStatus::Active && (container.customer_id.is_none() || container.uses_left == 0) {
        return Err(AppError::InvalidRequest(
            "Only a container with an owner and uses left can be reactivated".into(),
        ));
    }

    if status == ContainerStatus::Available {
        let container_type = store
            .container_type(&container.container_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Container type".into()))?;
        container.restock(container_type.max_uses, now)?;
    } else {
        container.transition_to(status, now)?;
    }

    store.save_container(&mut container).await?;

    store
        .record_activity(
            Activity::new(previous_owner.unwrap_or(actor_id), ActivityKind::StatusChange, now)
                .container(container.id, container.status)
                .notes(notes),
        )
        .await?;

    log::info!("🔄 Container {} is now {}", container.qr_code, container.status);
    Ok(container)
}

/// Marks active containers unused since `cutoff` as lost. Returns how many moved.
pub async fn sweep_abandoned<S: LifecycleStore + ?Sized>(
    store: &S,
    cutoff: i64,
    lost_after_days: u32,
) -> Result<usize, AppError> {
    let stale = store.stale_active_containers(cutoff).await?;
    let now = chrono::Utc::now().timestamp();
    let mut moved = 0;

    for mut container in stale {
        if container.transition_to(ContainerStatus::Lost, now).is_err() {
            continue;
        }
        match store.save_container(&mut container).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                log::debug!("⏭️  Container {} changed during sweep, skipping", container.qr_code);
                continue;
            }
            Err(e) => return Err(e),
        }

        if let Some(customer_id) = container.customer_id {
            store
                .record_activity(
                    Activity::new(customer_id, ActivityKind::StatusChange, now)
                        .container(container.id, container.status)
                        .notes(Some(format!("Marked lost after {} days without use", lost_after_days))),
                )
                .await?;
        }
        moved += 1;
    }

    Ok(moved)
}

/// Filtros de listagem de containers (query string)
#[derive(Debug, Default, serde::Deserialize)]
pub struct ContainerQuery {
    pub status: Option<ContainerStatus>,
    pub customer_id: Option<String>,
    pub container_type_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

/// Customers only ever see their own containers, whatever they ask for.
fn list_filter(caller: &Claims, query: &ContainerQuery) -> Result<Document, AppError> {
    let mut filter = doc! {};
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    if let Some(type_id) = &query.container_type_id {
        filter.insert("container_type_id", parse_object_id(type_id, "container type")?);
    }

    if caller.role == Role::Customer {
        filter.insert("customer_id", caller.user_id()?);
    } else if let Some(customer_id) = &query.customer_id {
        filter.insert("customer_id", parse_object_id(customer_id, "customer")?);
    }
    Ok(filter)
}

pub async fn list_containers(
    db: &MongoDB,
    caller: &Claims,
    query: &ContainerQuery,
) -> Result<(Vec<Container>, u64), AppError> {
    let filter = list_filter(caller, query)?;
    let page = PaginationQuery { limit: query.limit, offset: query.offset };
    let collection = db.collection::<Container>(CONTAINERS);

    let total = collection.count_documents(filter.clone()).await?;
    let containers = collection
        .find(filter)
        .sort(doc! { "updated_at": -1 })
        .skip(page.offset())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    Ok((containers, total))
}

/// Customers can read containers they own or that are still unclaimed.
fn ensure_visible(caller: &Claims, container: &Container) -> Result<(), AppError> {
    if caller.role != Role::Customer {
        return Ok(());
    }
    match container.customer_id {
        None => Ok(()),
        Some(owner) if owner == caller.user_id()? => Ok(()),
        Some(_) => Err(AppError::Forbidden("Container belongs to another customer".into())),
    }
}

pub async fn get_container(db: &MongoDB, caller: &Claims, id: &ObjectId) -> Result<Container, AppError> {
    let container = db
        .container_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Container".into()))?;
    ensure_visible(caller, &container)?;
    Ok(container)
}

pub async fn get_container_by_qr(db: &MongoDB, caller: &Claims, raw: &str) -> Result<Container, AppError> {
    let qr_code = normalized_qr(raw)?;
    let container = db
        .container_by_qr(&qr_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Container".into()))?;
    ensure_visible(caller, &container)?;
    Ok(container)
}

pub async fn delete_container(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    let result = db
        .collection::<Container>(CONTAINERS)
        .delete_one(doc! { "_id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Container".into()));
    }
    log::info!("🗑️  Container deleted: {}", id.to_hex());
    Ok(())
}

pub async fn container_stats(db: &MongoDB) -> Result<ContainerStats, AppError> {
    let pipeline = vec![doc! {
        "$group": {
            "_id": "$status",
            "count": { "$sum": 1 },
            "rebates": { "$sum": "$total_rebate" }
        }
    }];

    let mut cursor = db
        .collection::<Document>(CONTAINERS)
        .aggregate(pipeline)
        .await?;

    let mut stats = ContainerStats::default();
    while let Some(row) = cursor.try_next().await? {
        let status = match row.get_str("_id").ok().map(str::parse::<ContainerStatus>) {
            Some(Ok(status)) => status,
            _ => {
                log::warn!("⚠️  Unknown container status in stats: {:?}", row.get("_id"));
                continue;
            }
        };
        let count = numeric(&row, "count") as u64;
        let rebates = numeric(&row, "rebates");
        stats.add(status, count, rebates);
    }

    Ok(stats)
}

fn numeric(row: &Document, key: &str) -> f64 {
    match row.get(key) {
        Some(mongodb::bson::Bson::Int32(v)) => *v as f64,
        Some(mongodb::bson::Bson::Int64(v)) => *v as f64,
        Some(mongodb::bson::Bson::Double(v)) => *v,
        _ => 0.0,
    }
}

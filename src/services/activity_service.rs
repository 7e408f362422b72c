use crate::{
    database::{MongoDB, ACTIVITIES},
    models::{
        Activity, ActivityKind, ActivityQuery, ActivitySummary, CreateActivityRequest,
        PaginationQuery, Role,
    },
    services::auth_service::Claims,
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

/// Builds the list filter, scoping customers to themselves and staff to
/// their restaurant.
fn scoped_filter(caller: &Claims, query: &ActivityQuery) -> Result<Document, AppError> {
    let mut filter = doc! {};

    if let Some(user_id) = &query.user_id {
        filter.insert("user_id", parse_object_id(user_id, "user")?);
    }
    if let Some(restaurant_id) = &query.restaurant_id {
        filter.insert("restaurant_id", parse_object_id(restaurant_id, "restaurant")?);
    }
    if let Some(container_id) = &query.container_id {
        filter.insert("container_id", parse_object_id(container_id, "container")?);
    }
    if let Some(kind) = query.kind {
        filter.insert("kind", kind.as_str());
    }

    match caller.role {
        Role::Admin => {}
        Role::Customer => {
            filter.insert("user_id", caller.user_id()?);
        }
        Role::Staff => {
            let own = caller
                .restaurant_id()
                .ok_or_else(|| AppError::Forbidden("Staff account is not linked to a restaurant".into()))?;
            filter.insert("restaurant_id", own);
        }
    }

    Ok(filter)
}

pub async fn list_activities(
    db: &MongoDB,
    caller: &Claims,
    query: &ActivityQuery,
) -> Result<(Vec<Activity>, u64), AppError> {
    let filter = scoped_filter(caller, query)?;
    let page = PaginationQuery { limit: query.limit, offset: query.offset };
    let collection = db.collection::<Activity>(ACTIVITIES);

    let total = collection.count_documents(filter.clone()).await?;
    let activities = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(page.offset())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    Ok((activities, total))
}

fn optional_id(raw: &Option<String>, what: &str) -> Result<Option<ObjectId>, AppError> {
    raw.as_deref().map(|id| parse_object_id(id, what)).transpose()
}

/// Manual log entry (admin), e.g. to reconcile a rebate by hand.
pub async fn create_activity(db: &MongoDB, request: CreateActivityRequest) -> Result<Activity, AppError> {
    let amount = request.amount.unwrap_or(0.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidRequest("Amount must be zero or positive".into()));
    }

    let now = chrono::Utc::now().timestamp();
    let mut activity = Activity::new(parse_object_id(&request.user_id, "user")?, request.kind, now)
        .amount(amount)
        .notes(request.notes);
    activity.container_id = optional_id(&request.container_id, "container")?;
    activity.restaurant_id = optional_id(&request.restaurant_id, "restaurant")?;
    activity.status = request.status;

    let result = db
        .collection::<Activity>(ACTIVITIES)
        .insert_one(&activity)
        .await?;
    activity.id = result.inserted_id.as_object_id();

    Ok(activity)
}

pub async fn delete_activity(db: &MongoDB, id: &ObjectId) -> Result<(), AppError> {
    let result = db
        .collection::<Activity>(ACTIVITIES)
        .delete_one(doc! { "_id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Activity".into()));
    }
    Ok(())
}

/// Counts per kind and total rebates earned by one user.
pub async fn user_summary(db: &MongoDB, caller: &Claims, user_id: &ObjectId) -> Result<ActivitySummary, AppError> {
    caller.require_self_or_admin(user_id)?;

    let pipeline = vec![
        doc! { "$match": { "user_id": user_id } },
        doc! {
            "$group": {
                "_id": "$kind",
                "count": { "$sum": 1 },
                "amount": { "$sum": "$amount" }
            }
        },
    ];

    let mut cursor = db
        .collection::<Document>(ACTIVITIES)
        .aggregate(pipeline)
        .await?;

    let mut summary = ActivitySummary {
        user_id: user_id.to_hex(),
        ..Default::default()
    };

    while let Some(row) = cursor.try_next().await? {
        let kind = row
            .get_str("_id")
            .ok()
            .and_then(|k| ActivityKind::ALL.into_iter().find(|kind| kind.as_str() == k));
        let Some(kind) = kind else { continue };

        let count = match row.get("count") {
            Some(Bson::Int32(v)) => *v as u64,
            Some(Bson::Int64(v)) => *v as u64,
            _ => 0,
        };
        let amount = match row.get("amount") {
            Some(Bson::Double(v)) => *v,
            Some(Bson::Int32(v)) => *v as f64,
            Some(Bson::Int64(v)) => *v as f64,
            _ => 0.0,
        };
        summary.add(kind, count, amount);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::TokenKind;

    fn claims(role: Role, sub: ObjectId, restaurant: Option<ObjectId>) -> Claims {
        Claims {
            sub: sub.to_hex(),
            email: "x@aqro.ph".into(),
            role,
            restaurant_id: restaurant.map(|id| id.to_hex()),
            kind: TokenKind::Access,
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        }
    }

    #[test]
    fn test_customer_scope_overrides_user_filter() {
        let me = ObjectId::new();
        let query = ActivityQuery {
            user_id: Some(ObjectId::new().to_hex()),
            kind: Some(ActivityKind::Rebate),
            ..Default::default()
        };
        let filter = scoped_filter(&claims(Role::Customer, me, None), &query).unwrap();
        assert_eq!(filter.get_object_id("user_id").unwrap(), me);
        assert_eq!(filter.get_str("kind").unwrap(), "rebate");
    }

    #[test]
    fn test_staff_scope() {
        let shop = ObjectId::new();
        let filter = scoped_filter(&claims(Role::Staff, ObjectId::new(), Some(shop)), &ActivityQuery::default()).unwrap();
        assert_eq!(filter.get_object_id("restaurant_id").unwrap(), shop);

        let unlinked = scoped_filter(&claims(Role::Staff, ObjectId::new(), None), &ActivityQuery::default());
        assert!(matches!(unlinked, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_admin_filters_pass_through() {
        let container = ObjectId::new();
        let query = ActivityQuery { container_id: Some(container.to_hex()), ..Default::default() };
        let filter = scoped_filter(&claims(Role::Admin, ObjectId::new(), None), &query).unwrap();
        assert_eq!(filter.get_object_id("container_id").unwrap(), container);
        assert!(!filter.contains_key("user_id"));

        let bad = ActivityQuery { user_id: Some("zzz".into()), ..Default::default() };
        assert!(scoped_filter(&claims(Role::Admin, ObjectId::new(), None), &bad).is_err());
    }
}

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::ContainerStatus;

/// Tipo de evento registrado no log de atividades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Registration,
    Rebate,
    StatusChange,
    ContainerCreated,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::Registration,
        ActivityKind::Rebate,
        ActivityKind::StatusChange,
        ActivityKind::ContainerCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Registration => "registration",
            ActivityKind::Rebate => "rebate",
            ActivityKind::StatusChange => "status_change",
            ActivityKind::ContainerCreated => "container_created",
        }
    }
}

/// Entrada do log de atividades (armazenada no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Usuário afetado (cliente dono do container ou quem executou a ação)
    pub user_id: ObjectId,

    pub container_id: Option<ObjectId>,

    pub restaurant_id: Option<ObjectId>,

    pub kind: ActivityKind,

    /// Valor do rebate (0 para eventos sem valor)
    #[serde(default)]
    pub amount: f64,

    /// Status do container após o evento
    pub status: Option<ContainerStatus>,

    pub notes: Option<String>,

    pub created_at: i64,
}

impl Activity {
    pub fn new(user_id: ObjectId, kind: ActivityKind, now: i64) -> Self {
        Activity {
            id: None,
            user_id,
            container_id: None,
            restaurant_id: None,
            kind,
            amount: 0.0,
            status: None,
            notes: None,
            created_at: now,
        }
    }

    pub fn container(mut self, container_id: Option<ObjectId>, status: ContainerStatus) -> Self {
        self.container_id = container_id;
        self.status = Some(status);
        self
    }

    pub fn restaurant(mut self, restaurant_id: ObjectId) -> Self {
        self.restaurant_id = Some(restaurant_id);
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = super::round_money(amount);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Request (admin) para registrar uma atividade manual
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateActivityRequest {
    pub user_id: String,
    pub kind: ActivityKind,
    pub container_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<ContainerStatus>,
    pub notes: Option<String>,
}

/// Filtros de listagem (query string)
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub user_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub container_id: Option<String>,
    pub kind: Option<ActivityKind>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ActivityResponse {
    pub id: String,
    pub user_id: String,
    pub container_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub kind: ActivityKind,
    pub amount: f64,
    pub status: Option<ContainerStatus>,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        ActivityResponse {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: a.user_id.to_hex(),
            container_id: a.container_id.map(|id| id.to_hex()),
            restaurant_id: a.restaurant_id.map(|id| id.to_hex()),
            kind: a.kind,
            amount: a.amount,
            status: a.status,
            notes: a.notes,
            created_at: a.created_at,
        }
    }
}

/// Resumo de atividades de um usuário
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct ActivitySummary {
    pub user_id: String,
    pub total_rebates: f64,
    pub registrations: u64,
    pub rebates: u64,
    pub status_changes: u64,
    pub containers_created: u64,
}

impl ActivitySummary {
    pub fn add(&mut self, kind: ActivityKind, count: u64, amount: f64) {
        match kind {
            ActivityKind::Registration => self.registrations += count,
            ActivityKind::Rebate => {
                self.rebates += count;
                self.total_rebates = super::round_money(self.total_rebates + amount);
            }
            ActivityKind::StatusChange => self.status_changes += count,
            ActivityKind::ContainerCreated => self.containers_created += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let user = ObjectId::new();
        let container = ObjectId::new();
        let shop = ObjectId::new();
        let activity = Activity::new(user, ActivityKind::Rebate, 99)
            .container(Some(container), ContainerStatus::Active)
            .restaurant(shop)
            .amount(4.999)
            .notes(Some("  ".into()));

        assert_eq!(activity.amount, 5.0);
        assert_eq!(activity.container_id, Some(container));
        assert_eq!(activity.restaurant_id, Some(shop));
        assert_eq!(activity.status, Some(ContainerStatus::Active));
        assert!(activity.notes.is_none());
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(serde_json::to_string(&ActivityKind::StatusChange).unwrap(), "\"status_change\"");
        for kind in ActivityKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_summary_only_sums_rebates() {
        let mut summary = ActivitySummary::default();
        summary.add(ActivityKind::Rebate, 3, 15.0);
        summary.add(ActivityKind::StatusChange, 1, 99.0);
        summary.add(ActivityKind::Registration, 2, 0.0);
        assert_eq!(summary.total_rebates, 15.0);
        assert_eq!(summary.rebates, 3);
        assert_eq!(summary.registrations, 2);
    }
}

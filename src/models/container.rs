use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::AppError;

/// Status do ciclo de vida de um container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Em estoque, ainda sem cliente
    Available,
    /// Registrado por um cliente e em uso
    Active,
    /// Usos esgotados ou devolvido pelo staff
    Returned,
    Lost,
    Damaged,
}

impl ContainerStatus {
    pub const ALL: [ContainerStatus; 5] = [
        ContainerStatus::Available,
        ContainerStatus::Active,
        ContainerStatus::Returned,
        ContainerStatus::Lost,
        ContainerStatus::Damaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Available => "available",
            ContainerStatus::Active => "active",
            ContainerStatus::Returned => "returned",
            ContainerStatus::Lost => "lost",
            ContainerStatus::Damaged => "damaged",
        }
    }

    /// Allowed lifecycle edges. `damaged` is terminal.
    pub fn can_transition_to(&self, next: ContainerStatus) -> bool {
        use ContainerStatus::*;
        matches!(
            (*self, next),
            (Available, Active)
                | (Available, Lost)
                | (Available, Damaged)
                | (Active, Returned)
                | (Active, Lost)
                | (Active, Damaged)
                | (Returned, Available)
                | (Lost, Active)
                | (Lost, Available)
        )
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContainerStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ContainerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| AppError::InvalidRequest(format!("Unknown container status '{}'", s)))
    }
}

/// Tipo de container (copo 12oz, caixa de comida...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerType {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,

    pub description: Option<String>,

    /// Preço do container novo
    pub price: f64,

    /// Quantas vezes o container pode gerar rebate antes de ser devolvido
    pub max_uses: u32,

    pub image_url: Option<String>,

    pub created_at: i64,

    pub updated_at: i64,
}

/// Container físico rastreado por QR code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Código impresso no QR (único)
    pub qr_code: String,

    pub container_type_id: ObjectId,

    /// Cliente dono do container (None enquanto `available`)
    pub customer_id: Option<ObjectId>,

    pub status: ContainerStatus,

    pub uses_left: u32,

    /// Soma de todos os rebates pagos por este container
    pub total_rebate: f64,

    pub registered_at: Option<i64>,

    pub last_used_at: Option<i64>,

    pub last_restaurant_id: Option<ObjectId>,

    /// Incrementado a cada gravação; usado para detectar escrita concorrente
    #[serde(default)]
    pub version: i64,

    pub created_at: i64,

    pub updated_at: i64,
}

impl Container {
    pub fn new(qr_code: String, container_type: &ContainerType, now: i64) -> Result<Self, AppError> {
        let container_type_id = container_type
            .id
            .ok_or_else(|| AppError::Internal("Container type has no id".into()))?;

        Ok(Container {
            id: None,
            qr_code,
            container_type_id,
            customer_id: None,
            status: ContainerStatus::Available,
            uses_left: container_type.max_uses,
            total_rebate: 0.0,
            registered_at: None,
            last_used_at: None,
            last_restaurant_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the container to `next`, rejecting edges outside the lifecycle.
    pub fn transition_to(&mut self, next: ContainerStatus, now: i64) -> Result<(), AppError> {
        if self.status == next {
            return Err(AppError::InvalidRequest(format!("Container is already {}", next)));
        }
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidRequest(format!(
                "Cannot change container status from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Binds an available container to a customer and refills its uses.
    pub fn register_to(&mut self, customer_id: ObjectId, max_uses: u32, now: i64) -> Result<(), AppError> {
        if self.status != ContainerStatus::Available {
            return Err(AppError::InvalidRequest(format!(
                "Container cannot be registered while {}",
                self.status
            )));
        }
        self.transition_to(ContainerStatus::Active, now)?;
        self.customer_id = Some(customer_id);
        self.uses_left = max_uses;
        self.registered_at = Some(now);
        Ok(())
    }

    /// Consumes one use and books the rebate. Returns true when the last use
    /// was spent and the container moved to `returned`.
    pub fn consume_use(&mut self, restaurant_id: ObjectId, rebate: f64, now: i64) -> Result<bool, AppError> {
        if self.status != ContainerStatus::Active {
            return Err(AppError::InvalidRequest(format!(
                "Rebates can only be processed for active containers (container is {})",
                self.status
            )));
        }
        if self.customer_id.is_none() {
            return Err(AppError::InvalidRequest("Container is not registered to a customer".into()));
        }
        if self.uses_left == 0 {
            return Err(AppError::InvalidRequest("Container has no uses left".into()));
        }

        self.uses_left -= 1;
        self.total_rebate = super::round_money(self.total_rebate + rebate);
        self.last_used_at = Some(now);
        self.last_restaurant_id = Some(restaurant_id);
        self.updated_at = now;

        if self.uses_left == 0 {
            self.transition_to(ContainerStatus::Returned, now)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Puts a returned/lost container back in stock, ready for a new customer.
    pub fn restock(&mut self, max_uses: u32, now: i64) -> Result<(), AppError> {
        self.transition_to(ContainerStatus::Available, now)?;
        self.customer_id = None;
        self.uses_left = max_uses;
        self.registered_at = None;
        Ok(())
    }
}

/// Request para criar tipo de container
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateContainerTypeRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub max_uses: u32,
    pub image_url: Option<String>,
}

/// Request para atualizar tipo de container
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateContainerTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub max_uses: Option<u32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ContainerTypeResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub max_uses: u32,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ContainerType> for ContainerTypeResponse {
    fn from(t: ContainerType) -> Self {
        ContainerTypeResponse {
            id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: t.name,
            description: t.description,
            price: t.price,
            max_uses: t.max_uses,
            image_url: t.image_url,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request (admin) para gerar um lote de containers com QR codes novos
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateContainersRequest {
    pub container_type_id: String,
    pub quantity: Option<u32>,
}

/// Request (cliente) para registrar um container escaneado
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterContainerRequest {
    pub qr_code: String,
}

/// Request (staff) para processar rebate na devolução
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProcessRebateRequest {
    pub qr_code: String,
    /// Obrigatório para admin; staff usa o restaurante do token
    pub restaurant_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateContainerStatusRequest {
    pub status: ContainerStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ContainerResponse {
    pub id: String,
    pub qr_code: String,
    pub container_type_id: String,
    pub customer_id: Option<String>,
    pub status: ContainerStatus,
    pub uses_left: u32,
    pub total_rebate: f64,
    pub registered_at: Option<i64>,
    pub last_used_at: Option<i64>,
    pub last_restaurant_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Container> for ContainerResponse {
    fn from(c: Container) -> Self {
        ContainerResponse {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            qr_code: c.qr_code,
            container_type_id: c.container_type_id.to_hex(),
            customer_id: c.customer_id.map(|id| id.to_hex()),
            status: c.status,
            uses_left: c.uses_left,
            total_rebate: c.total_rebate,
            registered_at: c.registered_at,
            last_used_at: c.last_used_at,
            last_restaurant_id: c.last_restaurant_id.map(|id| id.to_hex()),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Resultado de um rebate processado
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RebateReceipt {
    pub container: ContainerResponse,
    pub customer_id: String,
    pub restaurant_id: String,
    pub rebate_amount: f64,
    pub uses_left: u32,
    /// true quando o último uso foi consumido e o container foi para `returned`
    pub completed: bool,
}

#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct ContainerStats {
    pub total: u64,
    pub available: u64,
    pub active: u64,
    pub returned: u64,
    pub lost: u64,
    pub damaged: u64,
    pub total_rebates: f64,
}

impl ContainerStats {
    pub fn add(&mut self, status: ContainerStatus, count: u64, rebates: f64) {
        match status {
            ContainerStatus::Available => self.available += count,
            ContainerStatus::Active => self.active += count,
            ContainerStatus::Returned => self.returned += count,
            ContainerStatus::Lost => self.lost += count,
            ContainerStatus::Damaged => self.damaged += count,
        }
        self.total += count;
        self.total_rebates = super::round_money(self.total_rebates + rebates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cup() -> ContainerType {
        ContainerType {
            id: Some(ObjectId::new()),
            name: "Cup 12oz".into(),
            description: None,
            price: 150.0,
            max_uses: 2,
            image_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_transition_table() {
        use ContainerStatus::*;
        assert!(Available.can_transition_to(Active));
        assert!(Active.can_transition_to(Returned));
        assert!(Returned.can_transition_to(Available));
        assert!(Lost.can_transition_to(Active));
        assert!(!Returned.can_transition_to(Active));
        assert!(!Available.can_transition_to(Returned));
        for next in ContainerStatus::ALL {
            assert!(!Damaged.can_transition_to(next));
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(" Lost ".parse::<ContainerStatus>().unwrap(), ContainerStatus::Lost);
        assert!("broken".parse::<ContainerStatus>().is_err());
        assert_eq!(serde_json::to_string(&ContainerStatus::Damaged).unwrap(), "\"damaged\"");
    }

    #[test]
    fn test_register_and_consume_until_returned() {
        let kind = cup();
        let mut container = Container::new("AQRO-x".into(), &kind, 10).unwrap();
        assert_eq!(container.status, ContainerStatus::Available);

        let customer = ObjectId::new();
        let shop = ObjectId::new();
        container.register_to(customer, kind.max_uses, 20).unwrap();
        assert_eq!(container.status, ContainerStatus::Active);
        assert_eq!(container.registered_at, Some(20));

        assert!(!container.consume_use(shop, 5.0, 30).unwrap());
        assert_eq!(container.uses_left, 1);
        assert!(container.consume_use(shop, 5.25, 40).unwrap());
        assert_eq!(container.uses_left, 0);
        assert_eq!(container.status, ContainerStatus::Returned);
        assert_eq!(container.total_rebate, 10.25);
        assert_eq!(container.last_restaurant_id, Some(shop));

        assert!(container.consume_use(shop, 5.0, 50).is_err());
    }

    #[test]
    fn test_register_requires_available() {
        let kind = cup();
        let mut container = Container::new("AQRO-x".into(), &kind, 0).unwrap();
        container.register_to(ObjectId::new(), 2, 1).unwrap();
        assert!(container.register_to(ObjectId::new(), 2, 2).is_err());
    }

    #[test]
    fn test_same_status_rejected() {
        let mut container = Container::new("AQRO-x".into(), &cup(), 0).unwrap();
        assert!(container.transition_to(ContainerStatus::Available, 1).is_err());
    }

    #[test]
    fn test_restock_clears_customer() {
        let kind = cup();
        let mut container = Container::new("AQRO-x".into(), &kind, 0).unwrap();
        container.register_to(ObjectId::new(), 2, 1).unwrap();
        container.transition_to(ContainerStatus::Lost, 2).unwrap();
        container.restock(kind.max_uses, 3).unwrap();
        assert_eq!(container.status, ContainerStatus::Available);
        assert!(container.customer_id.is_none());
        assert_eq!(container.uses_left, 2);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = ContainerStats::default();
        stats.add(ContainerStatus::Active, 3, 12.5);
        stats.add(ContainerStatus::Returned, 2, 20.0);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.total_rebates, 32.5);
    }
}

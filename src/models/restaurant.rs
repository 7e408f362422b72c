use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Valor de rebate pago por um restaurante para um tipo de container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateRate {
    pub container_type_id: ObjectId,
    pub amount: f64,
}

/// Cafeteria parceira (armazenada no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,

    /// Endereço / localização exibida no app
    pub location: String,

    pub contact_number: Option<String>,

    pub email: Option<String>,

    pub logo_url: Option<String>,

    /// Restaurantes inativos não processam rebates
    #[serde(default = "default_is_active")]
    pub is_active: bool,

    /// Tabela de rebates, no máximo uma entrada por tipo de container
    #[serde(default)]
    pub rebates: Vec<RebateRate>,

    pub created_at: i64,

    pub updated_at: i64,
}

fn default_is_active() -> bool {
    true
}

impl Restaurant {
    /// Rebate paid for one use of a container of the given type.
    pub fn rebate_for(&self, container_type_id: &ObjectId) -> Option<f64> {
        self.rebates
            .iter()
            .find(|r| &r.container_type_id == container_type_id)
            .map(|r| super::round_money(r.amount))
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RebateRateInput {
    pub container_type_id: String,
    pub amount: f64,
}

/// Request para criar restaurante
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub location: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub rebates: Vec<RebateRateInput>,
}

/// Request para atualizar restaurante
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RebateRateResponse {
    pub container_type_id: String,
    pub amount: f64,
}

/// Response de restaurante
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RestaurantResponse {
    pub id: String,
    pub name: String,
    pub location: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub rebates: Vec<RebateRateResponse>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Restaurant> for RestaurantResponse {
    fn from(r: Restaurant) -> Self {
        RestaurantResponse {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: r.name,
            location: r.location,
            contact_number: r.contact_number,
            email: r.email,
            logo_url: r.logo_url,
            is_active: r.is_active,
            rebates: r
                .rebates
                .into_iter()
                .map(|rate| RebateRateResponse {
                    container_type_id: rate.container_type_id.to_hex(),
                    amount: rate.amount,
                })
                .collect(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cafe() -> Restaurant {
        Restaurant {
            id: Some(ObjectId::new()),
            name: "Kape Tayo".into(),
            location: "Katipunan".into(),
            contact_number: None,
            email: None,
            logo_url: None,
            is_active: true,
            rebates: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_rebate_lookup() {
        let cup = ObjectId::new();
        let bowl = ObjectId::new();
        let mut r = cafe();
        assert_eq!(r.rebate_for(&cup), None);

        r.rebates.push(RebateRate { container_type_id: cup, amount: 7.126 });
        r.rebates.push(RebateRate { container_type_id: bowl, amount: 8.5 });

        assert_eq!(r.rebate_for(&cup), Some(7.13));
        assert_eq!(r.rebate_for(&bowl), Some(8.5));
    }

    #[test]
    fn test_is_active_defaults_true() {
        let doc = mongodb::bson::doc! {
            "name": "Kape Tayo",
            "location": "Katipunan",
            "created_at": 0_i64,
            "updated_at": 0_i64,
        };
        let r: Restaurant = mongodb::bson::from_document(doc).unwrap();
        assert!(r.is_active);
        assert!(r.rebates.is_empty());
    }
}

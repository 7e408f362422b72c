pub mod activity;
pub mod chat_history;
pub mod container;
pub mod restaurant;
pub mod user;

pub use activity::*;
pub use chat_history::*;
pub use container::*;
pub use restaurant::*;
pub use user::*;

/// Arredonda valores monetários para centavos
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Paginação comum das listagens
#[derive(Debug, Default, serde::Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

impl PaginationQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(7.126), 7.13);
        assert_eq!(round_money(2.0), 2.0);
    }

    #[test]
    fn test_pagination_bounds() {
        let q = PaginationQuery::default();
        assert_eq!(q.limit(), 50);
        assert_eq!(q.offset(), 0);
        let q = PaginationQuery { limit: Some(10_000), offset: Some(20) };
        assert_eq!(q.limit(), 200);
        let q = PaginationQuery { limit: Some(-3), offset: None };
        assert_eq!(q.limit(), 1);
    }
}

use std::env;
use std::fmt::Display;
use std::str::FromStr;

const DEFAULT_ORIGINS: &str = "http://localhost:8081,http://localhost:19006,http://127.0.0.1:8081,http://127.0.0.1:19006";

/// Runtime configuration, read once from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Days without use before an active container is considered lost. 0 disables the sweep.
    pub lost_after_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let admin_email = lookup("ADMIN_EMAIL").filter(|v| !v.is_empty());
        let admin_password = lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty());

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3002)?,
            database_url,
            allowed_origins,
            admin_email,
            admin_password,
            lost_after_days: parse_or(&lookup, "LOST_AFTER_DAYS", 90)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "mongodb://localhost:27017/aqro")]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3002");
        assert_eq!(config.lost_after_days, 90);
        assert_eq!(config.allowed_origins.len(), 4);
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = config_from(&[("DATABASE_URL", "mongodb://db/aqro"), ("PORT", "http")]).unwrap_err();
        assert!(err.contains("PORT"));
    }

    #[test]
    fn test_origins_split() {
        let config = config_from(&[
            ("DATABASE_URL", "mongodb://db/aqro"),
            ("ALLOWED_ORIGINS", "https://app.aqro.ph, ,https://admin.aqro.ph"),
            ("LOST_AFTER_DAYS", "0"),
        ])
        .unwrap();
        assert_eq!(config.allowed_origins, vec!["https://app.aqro.ph", "https://admin.aqro.ph"]);
        assert_eq!(config.lost_after_days, 0);
    }
}

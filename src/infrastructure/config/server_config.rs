use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::esewa_config::required;

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// 浏览器回跳页面的基础地址
    pub public_base_url: String,
}

impl ServerConfig {
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                DomainError::ConfigurationError(format!(
                    "SERVER_PORT must be a port number, got {:?}",
                    raw
                ))
            })?,
            None => 3000,
        };

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            public_base_url: required(&lookup, "PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

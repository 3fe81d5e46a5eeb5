use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::esewa_config::required;
use std::sync::Arc;
use std::time::Duration;

/// Khalti 配置
#[derive(Clone)]
pub struct KhaltiConfig {
    /// 商户密钥
    pub secret_key: String,

    /// API基础URL
    pub base_url: String,

    /// 对外访问地址
    pub public_base_url: String,

    /// 请求超时
    pub timeout: Duration,
}

impl KhaltiConfig {
    pub fn from_env() -> DomainResult<Arc<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok()).map(Arc::new)
    }

    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("KHALTI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DomainError::ConfigurationError(format!(
                    "KHALTI_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    raw
                ))
            })?,
            None => 30,
        };

        Ok(Self {
            secret_key: required(&lookup, "KHALTI_SECRET_KEY")?,
            base_url: lookup("KHALTI_BASE_URL")
                .unwrap_or_else(|| "https://a.khalti.com/api/v2".to_string())
                .trim_end_matches('/')
                .to_string(),
            public_base_url: required(&lookup, "PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn return_url(&self) -> String {
        format!("{}/payment/khalti/success", self.public_base_url)
    }
}

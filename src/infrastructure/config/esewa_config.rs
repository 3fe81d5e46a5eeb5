use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// eSewa 配置
#[derive(Clone, Serialize, Deserialize)]
pub struct EsewaConfig {
    /// 商户代码（product_code）
    pub merchant_code: String,

    /// 商户共享密钥（HMAC-SHA256）
    pub merchant_secret: String,

    /// 对外访问地址，用于拼接回调地址（无尾部斜杠）
    pub public_base_url: String,

    /// 网关支付表单地址
    pub form_url: String,
}

impl std::fmt::Debug for EsewaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsewaConfig")
            .field("merchant_code", &self.merchant_code)
            .field("merchant_secret", &"***")
            .field("public_base_url", &self.public_base_url)
            .field("form_url", &self.form_url)
            .finish()
    }
}

pub const DEFAULT_ESEWA_FORM_URL: &str = "https://rc-epay.esewa.com.np/api/epay/main/v2/form";

impl EsewaConfig {
    pub fn from_env() -> DomainResult<Arc<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok()).map(Arc::new)
    }

    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            merchant_code: required(&lookup, "ESEWA_MERCHANT_ID")?,
            merchant_secret: required(&lookup, "ESEWA_MERCHANT_SECRET")?,
            public_base_url: required(&lookup, "PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            form_url: lookup("ESEWA_FORM_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ESEWA_FORM_URL.to_string()),
        })
    }

    pub fn success_url(&self) -> String {
        format!("{}/payment/esewa/success", self.public_base_url)
    }

    pub fn failure_url(&self) -> String {
        format!("{}/payment/esewa/failure", self.public_base_url)
    }
}

/// 读取必填配置项；缺失或为空均视为配置错误
pub(crate) fn required<F>(lookup: &F, key: &str) -> DomainResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::ConfigurationError(format!("{} must be set", key)))
}

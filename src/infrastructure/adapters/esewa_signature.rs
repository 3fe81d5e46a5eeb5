use crate::domain::errors::{DomainError, DomainResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 签名引擎，输出 base64
#[derive(Clone)]
pub struct SignatureEngine {
    keyed: HmacSha256,
}

impl SignatureEngine {
    /// 密钥为空视为配置错误，不允许签发或接受任何请求
    pub fn new(secret: &str) -> DomainResult<Self> {
        if secret.is_empty() {
            return Err(DomainError::ConfigurationError(
                "eSewa merchant secret is not configured".to_string(),
            ));
        }

        let keyed = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DomainError::ConfigurationError(format!("Invalid HMAC key: {}", e)))?;

        Ok(Self { keyed })
    }

    /// 生成签名
    pub fn sign(&self, canonical: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(canonical.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// 常量时间比较签名；非法 base64 视为不一致
    pub fn verify(&self, canonical: &str, supplied: &str) -> bool {
        let Ok(supplied) = STANDARD.decode(supplied.trim()) else {
            return false;
        };

        let mut mac = self.keyed.clone();
        mac.update(canonical.as_bytes());
        mac.verify_slice(&supplied).is_ok()
    }
}

use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::khalti_config::KhaltiConfig;
use crate::ports::khalti_port::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Khalti 适配器实现
#[derive(Clone)]
pub struct KhaltiAdapter {
    config: Arc<KhaltiConfig>,
    client: Client,
}

impl KhaltiAdapter {
    pub fn new(config: Arc<KhaltiConfig>) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DomainError::ConfigurationError(format!("Failed to initialize HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// 网络层错误与网关拒绝分开上报
    fn map_transport_error(e: reqwest::Error) -> DomainError {
        if e.is_timeout() || e.is_connect() {
            DomainError::GatewayUnavailable(format!("Khalti unreachable: {}", e))
        } else {
            DomainError::HttpError(e)
        }
    }
}

/// 发往 Khalti 的请求体
#[derive(Debug, Serialize)]
struct InitiatePayload<'a> {
    return_url: String,
    website_url: &'a str,
    #[serde(flatten)]
    request: &'a KhaltiInitiateRequest,
}

/// 校验响应字段完整性
fn validate_response(response: &KhaltiInitiateResponse) -> DomainResult<()> {
    if response.pidx.trim().is_empty()
        || response.payment_url.trim().is_empty()
        || response.expires_at.trim().is_empty()
        || response.expires_in <= 0
    {
        return Err(DomainError::GatewayDeclined(
            "Incomplete Khalti initiate response".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl KhaltiPort for KhaltiAdapter {
    async fn initiate(&self, request: KhaltiInitiateRequest) -> DomainResult<KhaltiInitiateResponse> {
        let url = format!("{}/epayment/initiate/", self.config.base_url);
        debug!("Khalti initiate request for {}", request.purchase_order_id);

        let payload = InitiatePayload {
            return_url: self.config.return_url(),
            website_url: &self.config.public_base_url,
            request: &request,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.config.secret_key))
            .json(&payload)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Khalti API error: {} - {}", status, error_text);
            return Err(if status.is_server_error() {
                DomainError::GatewayUnavailable(format!("Khalti returned {}", status))
            } else {
                DomainError::GatewayDeclined(format!("Khalti returned {}: {}", status, error_text))
            });
        }

        let body: KhaltiInitiateResponse =
            response.json().await.map_err(Self::map_transport_error)?;
        validate_response(&body)?;

        info!(
            purchase_order_id = %request.purchase_order_id,
            pidx = %body.pidx,
            "Khalti payment initiated"
        );
        Ok(body)
    }
}

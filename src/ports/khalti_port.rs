use crate::domain::errors::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Khalti 客户信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhaltiCustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Khalti 发起支付请求参数（回跳地址由适配器按配置补全）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhaltiInitiateRequest {
    /// 金额（paisa）
    pub amount: i64,
    pub purchase_order_id: String,
    pub purchase_order_name: String,
    pub customer_info: KhaltiCustomerInfo,
}

/// Khalti 发起支付响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhaltiInitiateResponse {
    pub pidx: String,
    pub payment_url: String,
    pub expires_at: String,
    pub expires_in: i64,
}

/// Khalti 端口接口
#[async_trait]
pub trait KhaltiPort: Send + Sync {
    /// 服务端发起支付，返回跳转地址
    async fn initiate(&self, request: KhaltiInitiateRequest) -> DomainResult<KhaltiInitiateResponse>;
}

use crate::domain::value_objects::{Charges, CustomerInfo, Money, PaymentMethod};
use crate::domain::{Order, PaymentDetails};
use crate::ports::esewa_port::EsewaPaymentRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 创建订单请求
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// 商品金额（paisa）
    pub amount: Money,

    /// 附加费用
    #[serde(default)]
    pub charges: Charges,

    /// 支付方式
    pub payment_method: PaymentMethod,

    /// 商品描述
    pub description: String,

    /// 客户信息
    pub customer: CustomerInfo,
}

/// 订单响应（不含内部失败原因）
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: uuid::Uuid,
    pub transaction_id: String,
    pub total_amount: i64,
    pub payment_method: String,
    pub status: String,
    pub payment_status: String,
    pub payment_details: Option<PaymentDetails>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            transaction_id: order.transaction_id.clone(),
            total_amount: order.total_amount.to_paisa(),
            payment_method: order.payment_method.to_string(),
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            payment_details: order.payment_details.clone(),
            created_at: order.created_at,
        }
    }
}

/// 发起支付请求
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub transaction_id: String,
}

/// eSewa 发起支付响应：表单地址 + 已签名的字段
#[derive(Debug, Serialize)]
pub struct EsewaCheckoutResponse {
    pub payment_url: String,
    pub payload: EsewaPaymentRequest,
}

/// Khalti 发起支付响应
#[derive(Debug, Serialize)]
pub struct KhaltiCheckoutResponse {
    pub payment_url: String,
    pub pidx: String,
    pub expires_at: String,
}

/// 回调处理后的浏览器去向
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRedirect {
    Success { transaction_id: String },
    Failure,
}

impl PaymentRedirect {
    /// 拼接站内结果页地址
    pub fn location(&self, public_base_url: &str) -> String {
        match self {
            PaymentRedirect::Success { transaction_id } => format!(
                "{}/payment/success?transaction_id={}",
                public_base_url, transaction_id
            ),
            PaymentRedirect::Failure => format!("{}/payment/failure", public_base_url),
        }
    }
}

/// 回调处理结果
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub redirect: PaymentRedirect,
    pub order: Option<Order>,
}

impl CallbackOutcome {
    pub fn failure(order: Option<Order>) -> Self {
        Self {
            redirect: PaymentRedirect::Failure,
            order,
        }
    }

    /// 去向只由订单最终状态决定
    pub fn from_order(order: Order) -> Self {
        let redirect = if order.status == crate::domain::OrderStatus::Completed {
            PaymentRedirect::Success {
                transaction_id: order.transaction_id.clone(),
            }
        } else {
            PaymentRedirect::Failure
        };
        Self {
            redirect,
            order: Some(order),
        }
    }
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}

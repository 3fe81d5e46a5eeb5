use crate::domain::errors::DomainResult;
use crate::domain::{Money, Order, SignedFieldNames};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// eSewa 支付请求（每次结账时构造，不落库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsewaPaymentRequest {
    pub amount: String,
    pub tax_amount: String,
    pub total_amount: String,
    pub transaction_uuid: String,
    pub product_code: String,
    pub product_service_charge: String,
    pub product_delivery_charge: String,
    pub success_url: String,
    pub failure_url: String,
    pub signed_field_names: SignedFieldNames,
    pub signature: String,
}

impl EsewaPaymentRequest {
    /// 按网关字段名取值
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "amount" => &self.amount,
            "tax_amount" => &self.tax_amount,
            "total_amount" => &self.total_amount,
            "transaction_uuid" => &self.transaction_uuid,
            "product_code" => &self.product_code,
            "product_service_charge" => &self.product_service_charge,
            "product_delivery_charge" => &self.product_delivery_charge,
            "success_url" => &self.success_url,
            "failure_url" => &self.failure_url,
            "signature" => &self.signature,
            "signed_field_names" => return Some(self.signed_field_names.to_string()),
            _ => return None,
        };
        Some(value.clone())
    }

    /// 表单字段（每个属性一个隐藏域）
    pub fn form_fields(&self) -> Vec<(String, String)> {
        [
            "amount",
            "tax_amount",
            "total_amount",
            "transaction_uuid",
            "product_code",
            "product_service_charge",
            "product_delivery_charge",
            "success_url",
            "failure_url",
            "signed_field_names",
            "signature",
        ]
        .iter()
        .filter_map(|name| self.field(name).map(|v| (name.to_string(), v)))
        .collect()
    }
}

/// 网关回调的两种形态，在路由边界处一次性区分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackInput {
    /// `?data=<base64 JSON>`
    Encoded(String),
    /// 逐字段的查询参数
    Plain(HashMap<String, String>),
}

impl CallbackInput {
    pub fn from_query(mut params: HashMap<String, String>) -> Self {
        match params.remove("data") {
            Some(data) => CallbackInput::Encoded(data),
            None => CallbackInput::Plain(params),
        }
    }
}

/// 验签通过的支付结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub transaction_id: String,
    pub amount: Money,
    pub reference_id: String,
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// 网关状态不是 COMPLETE
    NotComplete { status: String },
    /// 签名不一致，可能被篡改
    SignatureMismatch,
    /// 回调金额与订单金额不一致
    AmountMismatch { expected: Money, received: Money },
    /// 缺少必要字段
    MissingField(String),
    /// 回调的 signed_field_names 没有覆盖该字段
    UnsignedField(String),
    /// product_code 不是本商户
    MerchantMismatch { received: String },
    /// 报文无法解码
    MalformedPayload(String),
    /// 网关走了失败回调
    GatewayReportedFailure,
}

impl RejectionReason {
    /// 需要按安全事件记录的原因
    pub fn is_tamper_suspected(&self) -> bool {
        matches!(
            self,
            RejectionReason::SignatureMismatch
                | RejectionReason::AmountMismatch { .. }
                | RejectionReason::UnsignedField(_)
                | RejectionReason::MerchantMismatch { .. }
        )
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NotComplete { .. } => write!(f, "not complete"),
            RejectionReason::SignatureMismatch => write!(f, "signature mismatch"),
            RejectionReason::AmountMismatch { expected, received } => {
                write!(f, "amount mismatch: expected {}, received {}", expected, received)
            }
            RejectionReason::MissingField(name) => write!(f, "missing field: {}", name),
            RejectionReason::UnsignedField(name) => write!(f, "unsigned field: {}", name),
            RejectionReason::MerchantMismatch { received } => {
                write!(f, "merchant mismatch: {}", received)
            }
            RejectionReason::MalformedPayload(detail) => write!(f, "malformed payload: {}", detail),
            RejectionReason::GatewayReportedFailure => write!(f, "gateway reported failure"),
        }
    }
}

/// 回调验证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(VerifiedPayment),
    Rejected {
        /// 报文无法解析时可能拿不到交易号
        transaction_id: Option<String>,
        reason: RejectionReason,
    },
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Verification::Verified(payment) => Some(&payment.transaction_id),
            Verification::Rejected { transaction_id, .. } => transaction_id.as_deref(),
        }
    }
}

/// eSewa 网关端口接口
pub trait EsewaGatewayPort: Send + Sync {
    /// 网关支付表单地址
    fn form_endpoint(&self) -> &str;

    /// 构造并签名支付请求
    fn build_request(&self, order: &Order) -> DomainResult<EsewaPaymentRequest>;

    /// 解码回调并验签
    fn verify_callback(&self, input: CallbackInput) -> Verification;
}

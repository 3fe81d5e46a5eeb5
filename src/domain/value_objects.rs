use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 待支付
    Pending,
    /// 已完成
    Completed,
    /// 支付失败
    Failed,
    /// 已取消
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::DecodeError(format!(
                "Unknown order status: {}",
                other
            ))),
        }
    }
}

/// 支付状态（与订单状态同步）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl From<OrderStatus> for PaymentStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Completed => PaymentStatus::Success,
            OrderStatus::Failed | OrderStatus::Cancelled => PaymentStatus::Failed,
            OrderStatus::Pending => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::DecodeError(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// eSewa 表单跳转支付
    Esewa,
    /// Khalti 服务端发起支付
    Khalti,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Esewa => write!(f, "esewa"),
            PaymentMethod::Khalti => write!(f, "khalti"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esewa" => Ok(PaymentMethod::Esewa),
            "khalti" => Ok(PaymentMethod::Khalti),
            other => Err(DomainError::DecodeError(format!(
                "Unknown payment method: {}",
                other
            ))),
        }
    }
}

/// 货币金额（以 paisa 为单位，避免浮点数精度问题）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// 金额（paisa）
    pub amount_paisa: i64,
}

impl Money {
    pub const ZERO: Money = Money { amount_paisa: 0 };

    /// 创建新的金额对象（单位：卢比）
    pub fn from_rupees(amount: i64) -> Self {
        Self {
            amount_paisa: amount * 100,
        }
    }

    /// 创建新的金额对象（单位：paisa）
    pub fn from_paisa(paisa: i64) -> Self {
        Self {
            amount_paisa: paisa,
        }
    }

    /// 转换为 paisa
    pub fn to_paisa(&self) -> i64 {
        self.amount_paisa
    }

    pub fn is_positive(&self) -> bool {
        self.amount_paisa > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.amount_paisa
            .checked_add(other.amount_paisa)
            .map(Money::from_paisa)
    }

    /// 网关格式：不带千分位，整数金额不带小数部分（`1500`、`1500.50`）
    ///
    /// 签名串与表单字段使用同一个字符串，两侧格式必须完全一致。
    pub fn to_gateway_string(&self) -> String {
        let sign = if self.amount_paisa < 0 { "-" } else { "" };
        let abs = self.amount_paisa.unsigned_abs();
        let rupees = abs / 100;
        let paisa = abs % 100;
        if paisa == 0 {
            format!("{}{}", sign, rupees)
        } else {
            format!("{}{}.{:02}", sign, rupees, paisa)
        }
    }

    /// 解析网关回传的十进制金额，如 `1500`、`1500.0`、`1,500.50`
    pub fn parse_decimal(input: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidAmount(format!("Unparseable amount: {:?}", input));

        let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() || cleaned.starts_with('-') {
            return Err(invalid());
        }

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        // 超过两位的小数只允许是 0
        let (cents_part, rest) = fraction.split_at(fraction.len().min(2));
        if rest.chars().any(|c| c != '0') {
            return Err(invalid());
        }

        let rupees: i64 = whole.parse().map_err(|_| invalid())?;
        let mut paisa: i64 = if cents_part.is_empty() {
            0
        } else {
            cents_part.parse().map_err(|_| invalid())?
        };
        if cents_part.len() == 1 {
            paisa *= 10;
        }

        rupees
            .checked_mul(100)
            .and_then(|v| v.checked_add(paisa))
            .map(Money::from_paisa)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rs. {}.{:02}",
            self.amount_paisa / 100,
            (self.amount_paisa % 100).abs()
        )
    }
}

/// 附加费用（税费、服务费、配送费），缺省为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charges {
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub service_charge: Money,
    #[serde(default)]
    pub delivery_charge: Money,
}

impl Charges {
    /// totalAmount = amount + taxAmount + serviceCharge + deliveryCharge
    pub fn total_with(&self, amount: Money) -> DomainResult<Money> {
        amount
            .checked_add(self.tax_amount)
            .and_then(|m| m.checked_add(self.service_charge))
            .and_then(|m| m.checked_add(self.delivery_charge))
            .ok_or_else(|| DomainError::InvalidAmount("Total amount overflow".to_string()))
    }
}

/// 客户联系信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

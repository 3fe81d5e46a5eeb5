use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    Charges, CustomerInfo, Money, OrderStatus, PaymentMethod, PaymentStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 失败原因的最大长度（字符），与 orders.failure_reason 列宽一致
pub const FAILURE_REASON_MAX_CHARS: usize = 255;

/// 支付明细（对账成功后写入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// 支付渠道
    pub method: PaymentMethod,

    /// 网关流水号（eSewa transaction_code）
    pub reference_id: String,

    /// 网关确认的金额
    pub amount: Money,

    /// 本地交易号
    pub transaction_id: String,
}

/// 订单实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 订单ID（内部）
    pub id: Uuid,

    /// 交易号，与网关回调关联的唯一键
    pub transaction_id: String,

    /// 商品金额
    pub amount: Money,

    /// 附加费用
    pub charges: Charges,

    /// 应付总额
    pub total_amount: Money,

    /// 支付方式
    pub payment_method: PaymentMethod,

    /// 订单状态
    pub status: OrderStatus,

    /// 支付状态
    pub payment_status: PaymentStatus,

    /// 支付明细
    pub payment_details: Option<PaymentDetails>,

    /// 商品描述
    pub description: String,

    /// 客户信息
    pub customer: CustomerInfo,

    /// 失败原因（仅内部排查用，不对用户展示）
    #[serde(skip_serializing)]
    pub failure_reason: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 创建新的待支付订单
    pub fn new(
        amount: Money,
        charges: Charges,
        payment_method: PaymentMethod,
        description: String,
        customer: CustomerInfo,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "Amount must be greater than 0".to_string(),
            ));
        }

        for charge in [charges.tax_amount, charges.service_charge, charges.delivery_charge] {
            if charge.to_paisa() < 0 {
                return Err(DomainError::InvalidAmount(
                    "Charges must not be negative".to_string(),
                ));
            }
        }

        if description.trim().is_empty() || description.len() > 100 {
            return Err(DomainError::ValidationError(
                "Description must be 1-100 characters".to_string(),
            ));
        }

        if customer.name.trim().is_empty()
            || customer.email.trim().is_empty()
            || customer.phone.trim().is_empty()
        {
            return Err(DomainError::ValidationError(
                "Customer name, email and phone are required".to_string(),
            ));
        }

        let total_amount = charges.total_with(amount)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            transaction_id: Self::generate_transaction_id(now),
            amount,
            charges,
            total_amount,
            payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            description,
            customer,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 交易号：时间戳 + 随机 UUID，并发下单不会冲突，也无法被猜测
    fn generate_transaction_id(now: DateTime<Utc>) -> String {
        format!("{}-{}", now.format("%Y%m%d%H%M%S"), Uuid::new_v4().simple())
    }

    /// 标记为支付完成
    pub fn mark_as_completed(&mut self, details: PaymentDetails) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::InvalidState {
                expected: OrderStatus::Pending.to_string(),
                actual: self.status.to_string(),
            });
        }

        if details.transaction_id != self.transaction_id {
            return Err(DomainError::ValidationError(format!(
                "Payment details belong to {}, not {}",
                details.transaction_id, self.transaction_id
            )));
        }

        self.set_status(OrderStatus::Completed);
        self.payment_details = Some(details);
        Ok(())
    }

    /// 标记为支付失败
    pub fn mark_as_failed(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::InvalidState {
                expected: OrderStatus::Pending.to_string(),
                actual: self.status.to_string(),
            });
        }

        let reason: String = reason.into();
        self.set_status(OrderStatus::Failed);
        self.failure_reason = Some(reason.chars().take(FAILURE_REASON_MAX_CHARS).collect());
        Ok(())
    }

    fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.payment_status = PaymentStatus::from(status);
        self.updated_at = Utc::now();
    }

    /// 检查是否可以发起支付
    pub fn can_pay(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Sita Sharma".to_string(),
            email: "sita@example.com".to_string(),
            phone: "9800000000".to_string(),
        }
    }

    fn order() -> Order {
        Order::new(
            Money::from_rupees(1500),
            Charges::default(),
            PaymentMethod::Esewa,
            "Dhaka topi".to_string(),
            customer(),
        )
        .unwrap()
    }

    fn details_for(order: &Order) -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Esewa,
            reference_id: "000AE01".to_string(),
            amount: order.total_amount,
            transaction_id: order.transaction_id.clone(),
        }
    }

    #[test]
    fn test_create_order() {
        let order = order();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_amount.to_paisa(), 150000);
        assert!(order.can_pay());
    }

    #[test]
    fn test_total_includes_charges() {
        let order = Order::new(
            Money::from_rupees(1000),
            Charges {
                tax_amount: Money::from_rupees(130),
                service_charge: Money::ZERO,
                delivery_charge: Money::from_rupees(100),
            },
            PaymentMethod::Esewa,
            "Pashmina shawl".to_string(),
            customer(),
        )
        .unwrap();

        assert_eq!(order.total_amount, Money::from_rupees(1230));
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = order();
        let b = order();
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn test_mark_as_completed() {
        let mut order = order();
        let details = details_for(&order);

        order.mark_as_completed(details.clone()).unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.payment_details, Some(details));
    }

    #[test]
    fn test_failure_reason_fits_column() {
        let mut order = order();
        let reason = format!("malformed payload: {}", "ü,".repeat(200));

        order.mark_as_failed(reason.clone()).unwrap();

        let stored = order.failure_reason.unwrap();
        assert_eq!(stored.chars().count(), FAILURE_REASON_MAX_CHARS);
        assert!(reason.starts_with(&stored));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut order = order();
        order.mark_as_failed("signature mismatch").unwrap();

        let details = details_for(&order);
        assert!(matches!(
            order.mark_as_completed(details),
            Err(DomainError::InvalidState { .. })
        ));
        assert!(order.mark_as_failed("again").is_err());
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.failure_reason.as_deref(), Some("signature mismatch"));
    }

    #[test]
    fn test_invalid_amount() {
        let result = Order::new(
            Money::from_paisa(0),
            Charges::default(),
            PaymentMethod::Esewa,
            "Dhaka topi".to_string(),
            customer(),
        );

        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
    }

    #[test]
    fn test_failure_reason_not_serialized() {
        let mut order = order();
        order.mark_as_failed("signature mismatch").unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("failure_reason").is_none());
        assert_eq!(json["status"], "failed");
    }
}

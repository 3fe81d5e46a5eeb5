use crate::domain::entities::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 领域事件trait
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// 支付完成事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: Uuid,
    pub transaction_id: String,
    pub reference_id: String,
    pub amount: i64,
}

impl DomainEvent for PaymentCompleted {
    fn event_type(&self) -> &'static str {
        "PaymentCompleted"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl PaymentCompleted {
    /// 订单必须已带有支付明细
    pub fn from_order(order: &Order) -> Option<Self> {
        let details = order.payment_details.as_ref()?;
        Some(Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id: order.id,
            transaction_id: order.transaction_id.clone(),
            reference_id: details.reference_id.clone(),
            amount: details.amount.to_paisa(),
        })
    }
}

/// 支付失败事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: Uuid,
    pub transaction_id: String,
    pub reason: String,
}

impl DomainEvent for PaymentFailed {
    fn event_type(&self) -> &'static str {
        "PaymentFailed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl PaymentFailed {
    pub fn new(order: &Order, reason: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id: order.id,
            transaction_id: order.transaction_id.clone(),
            reason,
        }
    }
}

/// 对账产生的事件；重复回调不会再产生事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    Completed(PaymentCompleted),
    Failed(PaymentFailed),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::Completed(e) => e.event_type(),
            PaymentEvent::Failed(e) => e.event_type(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PaymentEvent::Completed(e) => e.occurred_at(),
            PaymentEvent::Failed(e) => e.occurred_at(),
        }
    }
}

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    Charges, CustomerInfo, Money, Order, OrderStatus, PaymentDetails, PaymentMethod,
};
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::{debug, warn};

/// MySQL订单仓储实现
#[derive(Clone)]
pub struct MySqlOrderRepository {
    pool: Arc<Pool<MySql>>,
}

impl MySqlOrderRepository {
    pub fn new(pool: Arc<Pool<MySql>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryPort for MySqlOrderRepository {
    /// 保存订单
    async fn save(&self, order: &Order) -> DomainResult<()> {
        let query = r#"
            INSERT INTO orders (
                id, transaction_id, amount_paisa, tax_paisa,
                service_charge_paisa, delivery_charge_paisa, total_paisa,
                payment_method, status, payment_status, description,
                customer_name, customer_email, customer_phone,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(order.id)
            .bind(&order.transaction_id)
            .bind(order.amount.to_paisa())
            .bind(order.charges.tax_amount.to_paisa())
            .bind(order.charges.service_charge.to_paisa())
            .bind(order.charges.delivery_charge.to_paisa())
            .bind(order.total_amount.to_paisa())
            .bind(order.payment_method.to_string())
            .bind(order.status.to_string())
            .bind(order.payment_status.to_string())
            .bind(&order.description)
            .bind(&order.customer.name)
            .bind(&order.customer.email)
            .bind(&order.customer.phone)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(self.pool.as_ref())
            .await?;

        debug!("Order saved: {}", order.transaction_id);
        Ok(())
    }

    /// 根据交易号查找
    async fn find_by_transaction_id(&self, transaction_id: &str) -> DomainResult<Option<Order>> {
        let query = r#"
            SELECT id, transaction_id, amount_paisa, tax_paisa,
                   service_charge_paisa, delivery_charge_paisa, total_paisa,
                   payment_method, status, description,
                   customer_name, customer_email, customer_phone,
                   payment_reference_id, payment_amount_paisa, failure_reason,
                   created_at, updated_at
            FROM orders
            WHERE transaction_id = ?
        "#;

        let result = sqlx::query_as::<_, OrderRow>(query)
            .bind(transaction_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        result.map(OrderRow::into_order).transpose()
    }

    /// 以当前状态为条件的单条原子更新
    async fn transition(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool> {
        let query = r#"
            UPDATE orders
            SET status = ?, payment_status = ?, payment_reference_id = ?,
                payment_amount_paisa = ?, failure_reason = ?, updated_at = ?
            WHERE transaction_id = ? AND status = ?
        "#;

        let details = order.payment_details.as_ref();
        let rows_affected = sqlx::query(query)
            .bind(order.status.to_string())
            .bind(order.payment_status.to_string())
            .bind(details.map(|d| d.reference_id.clone()))
            .bind(details.map(|d| d.amount.to_paisa()))
            .bind(&order.failure_reason)
            .bind(order.updated_at)
            .bind(&order.transaction_id)
            .bind(expected.to_string())
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();

        if rows_affected == 0 {
            warn!(
                "Order {} was not in state {}, update skipped",
                order.transaction_id, expected
            );
            return Ok(false);
        }

        debug!("Order updated: {} -> {}", order.transaction_id, order.status);
        Ok(true)
    }
}

/// 数据库行结构体
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: uuid::Uuid,
    transaction_id: String,
    amount_paisa: i64,
    tax_paisa: i64,
    service_charge_paisa: i64,
    delivery_charge_paisa: i64,
    total_paisa: i64,
    payment_method: String,
    status: String,
    description: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    payment_reference_id: Option<String>,
    payment_amount_paisa: Option<i64>,
    failure_reason: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl OrderRow {
    fn into_order(self) -> DomainResult<Order> {
        let payment_method: PaymentMethod = self.payment_method.parse()?;
        let status: OrderStatus = self.status.parse()?;

        let payment_details = match (self.payment_reference_id, self.payment_amount_paisa) {
            (Some(reference_id), Some(amount)) => Some(PaymentDetails {
                method: payment_method,
                reference_id,
                amount: Money::from_paisa(amount),
                transaction_id: self.transaction_id.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(DomainError::DecodeError(format!(
                    "Partial payment details stored for {}",
                    self.transaction_id
                )));
            }
        };

        Ok(Order {
            id: self.id,
            transaction_id: self.transaction_id,
            amount: Money::from_paisa(self.amount_paisa),
            charges: Charges {
                tax_amount: Money::from_paisa(self.tax_paisa),
                service_charge: Money::from_paisa(self.service_charge_paisa),
                delivery_charge: Money::from_paisa(self.delivery_charge_paisa),
            },
            total_amount: Money::from_paisa(self.total_paisa),
            payment_method,
            status,
            payment_status: status.into(),
            payment_details,
            description: self.description,
            customer: CustomerInfo {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

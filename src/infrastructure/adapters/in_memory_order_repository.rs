use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Order, OrderStatus};
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 内存订单仓储（测试用）
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepositoryPort for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> DomainResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.transaction_id) {
            return Err(DomainError::ValidationError(format!(
                "Duplicate transaction id: {}",
                order.transaction_id
            )));
        }
        orders.insert(order.transaction_id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> DomainResult<Option<Order>> {
        Ok(self.orders.read().await.get(transaction_id).cloned())
    }

    async fn transition(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool> {
        // 读-判断-写在同一把写锁内完成
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.transaction_id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DomainError::OrderNotFound(order.transaction_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Charges, CustomerInfo, Money, PaymentMethod};

    fn order() -> Order {
        Order::new(
            Money::from_rupees(500),
            Charges::default(),
            PaymentMethod::Esewa,
            "Cotton kurta".to_string(),
            CustomerInfo {
                name: "Ram Thapa".to_string(),
                email: "ram@example.com".to_string(),
                phone: "9811111111".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transition_is_guarded_by_status() {
        let repository = InMemoryOrderRepository::new();
        let order = order();
        repository.save(&order).await.unwrap();

        let mut failed = order.clone();
        failed.mark_as_failed("not complete").unwrap();
        assert!(repository.transition(&failed, OrderStatus::Pending).await.unwrap());

        // 第二次以 pending 为前提的写入被拒绝
        assert!(!repository.transition(&failed, OrderStatus::Pending).await.unwrap());

        let stored = repository
            .find_by_transaction_id(&order.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_id_rejected() {
        let repository = InMemoryOrderRepository::new();
        let order = order();
        repository.save(&order).await.unwrap();
        assert!(repository.save(&order).await.is_err());
    }
}

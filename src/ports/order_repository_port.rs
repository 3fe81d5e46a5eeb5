use crate::domain::errors::DomainResult;
use crate::domain::{Order, OrderStatus};
use async_trait::async_trait;

/// 订单仓储端口接口
#[async_trait]
pub trait OrderRepositoryPort: Send + Sync {
    /// 保存新订单
    async fn save(&self, order: &Order) -> DomainResult<()>;

    /// 根据交易号查找
    async fn find_by_transaction_id(&self, transaction_id: &str) -> DomainResult<Option<Order>>;

    /// 条件更新：仅当存储中的状态仍为 `expected` 时写入 `order` 的新状态。
    ///
    /// 返回 `false` 表示状态已被其他请求改变（例如网关重复回调），本次未写入。
    async fn transition(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool>;
}

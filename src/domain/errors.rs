use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 配置错误（缺少密钥、商户号、回调地址等），必须阻止发起支付
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 订单未找到
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// 订单状态错误
    #[error("Invalid order state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// 金额无效
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// 网关拒绝请求
    #[error("Gateway declined: {0}")]
    GatewayDeclined(String),

    /// 网关不可达或超时
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 解码错误
    #[error("Decode error: {0}")]
    DecodeError(String),
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;

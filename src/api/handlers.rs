use crate::application::{CheckoutRequest, CreateOrderRequest, ErrorResponse, PaymentService};
use crate::domain::errors::DomainError;
use crate::infrastructure::AutoSubmitForm;
use crate::ports::esewa_port::CallbackInput;
use crate::ports::{EsewaGatewayPort, KhaltiPort, OrderRepositoryPort};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// 应用状态
pub struct AppState<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort> {
    pub payment_service: Arc<PaymentService<E, K, R>>,
    /// 回调结束后浏览器跳转的站点地址
    pub public_base_url: Arc<str>,
}

impl<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort> Clone for AppState<E, K, R> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::ValidationError(_) | DomainError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidState { .. } => StatusCode::CONFLICT,
        DomainError::GatewayDeclined(_) | DomainError::HttpError(_) => StatusCode::BAD_GATEWAY,
        DomainError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(code: &str, e: DomainError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("{} error: {}", code, e);
    } else {
        info!("{} rejected: {}", code, e);
    }
    (
        status,
        Json(ErrorResponse::new(code.to_string(), e.to_string())),
    )
}

/// 创建订单
pub async fn create_order<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        payment_method = %request.payment_method,
        "Received order creation request"
    );

    state
        .payment_service
        .create_order(request)
        .await
        .map(|response| (StatusCode::CREATED, Json(response)))
        .map_err(|e| api_error("ORDER_ERROR", e))
}

/// 查询订单
pub async fn query_order<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received order query request: {}", transaction_id);

    state
        .payment_service
        .query_order(&transaction_id)
        .await
        .map(Json)
        .map_err(|e| api_error("QUERY_ERROR", e))
}

/// eSewa 发起支付（返回表单地址与签名字段）
pub async fn initiate_esewa<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received eSewa checkout request: {}", request.transaction_id);

    state
        .payment_service
        .initiate_esewa(&request.transaction_id)
        .await
        .map(Json)
        .map_err(|e| api_error("PAYMENT_ERROR", e))
}

/// eSewa 自动提交表单页
pub async fn esewa_checkout_page<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Path(transaction_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    state
        .payment_service
        .checkout_esewa(&transaction_id, &AutoSubmitForm)
        .await
        .map(Html)
        .map_err(|e| api_error("PAYMENT_ERROR", e))
}

/// Khalti 发起支付
pub async fn initiate_khalti<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received Khalti checkout request: {}", request.transaction_id);

    state
        .payment_service
        .initiate_khalti(&request.transaction_id)
        .await
        .map(Json)
        .map_err(|e| api_error("PAYMENT_ERROR", e))
}

/// eSewa 成功回调
pub async fn esewa_success<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    info!("Received eSewa success callback");

    let outcome = state
        .payment_service
        .handle_esewa_success(CallbackInput::from_query(params))
        .await;
    Redirect::to(&outcome.redirect.location(&state.public_base_url))
}

/// eSewa 失败回调
pub async fn esewa_failure<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort>(
    State(state): State<AppState<E, K, R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    info!("Received eSewa failure callback");

    let outcome = state.payment_service.handle_esewa_failure(params).await;
    Redirect::to(&outcome.redirect.location(&state.public_base_url))
}

/// 健康检查
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

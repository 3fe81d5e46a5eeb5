use super::handlers::*;
use crate::domain::errors::{DomainError, DomainResult};
use crate::ports::{EsewaGatewayPort, KhaltiPort, OrderRepositoryPort};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// 只允许店面自身的来源调用 JSON 接口
fn storefront_cors(public_base_url: &str) -> DomainResult<CorsLayer> {
    let origin = HeaderValue::from_str(public_base_url).map_err(|e| {
        DomainError::ConfigurationError(format!("PUBLIC_BASE_URL is not a valid origin: {}", e))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn create_router<E, K, R>(state: AppState<E, K, R>) -> DomainResult<Router>
where
    E: EsewaGatewayPort + 'static,
    K: KhaltiPort + 'static,
    R: OrderRepositoryPort + 'static,
{
    let cors = storefront_cors(&state.public_base_url)?;

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/api/orders", post(create_order))
        .route("/api/orders/:transaction_id", get(query_order))
        .route("/api/payments/esewa", post(initiate_esewa))
        .route(
            "/payments/esewa/:transaction_id/checkout",
            get(esewa_checkout_page),
        )
        .route("/api/payments/khalti", post(initiate_khalti))
        .route("/payment/esewa/success", get(esewa_success))
        .route("/payment/esewa/failure", get(esewa_failure))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

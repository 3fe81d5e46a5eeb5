pub mod dispatcher;
pub mod dto;
pub mod payment_service;

pub use dispatcher::GatewayRedirectDispatcher;
pub use dto::*;
pub use payment_service::{PaymentService, ReconciledOrder};

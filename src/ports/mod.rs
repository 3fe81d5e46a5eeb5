pub mod esewa_port;
pub mod khalti_port;
pub mod order_repository_port;
pub mod user_agent_port;

pub use esewa_port::EsewaGatewayPort;
pub use khalti_port::KhaltiPort;
pub use order_repository_port::OrderRepositoryPort;
pub use user_agent_port::{GatewayForm, UserAgentRedirect};

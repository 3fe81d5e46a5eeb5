pub mod adapters;
pub mod config;

pub use adapters::{AutoSubmitForm, EsewaGatewayAdapter, KhaltiAdapter, MySqlOrderRepository};
pub use config::{EsewaConfig, KhaltiConfig, ServerConfig};

pub mod esewa_config;
pub mod khalti_config;
pub mod server_config;

pub use esewa_config::EsewaConfig;
pub use khalti_config::KhaltiConfig;
pub use server_config::ServerConfig;

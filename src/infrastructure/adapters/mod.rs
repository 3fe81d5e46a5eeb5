pub mod auto_submit_form;
pub mod esewa_gateway_adapter;
pub mod esewa_signature;
#[cfg(test)]
pub mod in_memory_order_repository;
pub mod khalti_adapter;
pub mod mysql_order_repository;

pub use auto_submit_form::AutoSubmitForm;
pub use esewa_gateway_adapter::EsewaGatewayAdapter;
pub use esewa_signature::SignatureEngine;
#[cfg(test)]
pub use in_memory_order_repository::InMemoryOrderRepository;
pub use khalti_adapter::KhaltiAdapter;
pub use mysql_order_repository::MySqlOrderRepository;

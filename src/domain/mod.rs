pub mod entities;
pub mod errors;
pub mod events;
pub mod signed_fields;
pub mod value_objects;

pub use entities::{Order, PaymentDetails};
pub use errors::{DomainError, DomainResult};
pub use events::*;
pub use signed_fields::SignedFieldNames;
pub use value_objects::{Charges, CustomerInfo, Money, OrderStatus, PaymentMethod, PaymentStatus};

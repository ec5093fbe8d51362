pub mod pii;
pub mod phone;

pub use pii::Masked;
pub use phone::{PhoneError, PhoneNumber};

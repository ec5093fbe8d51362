//! HTTP clients for the third-party services behind the booking flow.

pub mod inventory;
pub mod razorpay;
pub mod sms;

pub use inventory::{HttpInventoryProvider, InventoryConfig};
pub use razorpay::{checkout_signature, RazorpayConfig, RazorpayGateway};
pub use sms::{MetaReachSms, SmsConfig};

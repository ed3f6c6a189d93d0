//! SMS notification subsystem.
//!
//! Phone normalization, message templates, vendor clients behind the
//! [`SmsProvider`] trait, and the [`SmsDispatcher`] facade that ties them
//! together.

pub mod dispatch;
pub mod iprogtech;
pub mod phone;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod semaphore;
pub mod templates;

pub use dispatch::{BalanceResult, DispatchResult, Recipient, SmsDispatcher};
pub use iprogtech::IProgTechClient;
pub use phone::normalize_phone_number;
pub use provider::{SendReceipt, SmsProvider};
pub use registry::ProviderRegistry;
pub use routes::{SmsState, sms_routes};
pub use semaphore::SemaphoreClient;
pub use templates::{MessageInfo, message_info, truncate_message};

//! OSCA Notify: SMS notifications for the senior citizens affairs portal.

pub mod config;
pub mod error;
pub mod sms;
pub mod store;

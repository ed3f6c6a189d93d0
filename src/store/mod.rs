//! Persistence layer: libSQL-backed senior citizen recipient lookup.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Celebrant, NewSenior, RecipientStore, SeniorStatus};

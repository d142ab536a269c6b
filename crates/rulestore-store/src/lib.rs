pub mod database;
pub mod error;
pub mod row_helpers;
pub mod rules;
pub mod schema;

pub use database::{Database, DEFAULT_BUSY_TIMEOUT};
pub use error::StoreError;
pub use row_helpers::{Scanned, StoredRule};
pub use rules::RuleRepo;
pub use schema::{TableName, DEFAULT_TABLE};

//! SQLite-backed storage for authorization policy rules.
//!
//! [`SqliteAdapter`] implements the [`Adapter`] persistence seam: full and
//! filtered loads into a policy [`Model`], wholesale save, and point, batch
//! and filtered mutations, each batch running as one transaction.

pub mod adapter;
pub mod settings;

pub use adapter::SqliteAdapter;
pub use rulestore_core::{
    Adapter, Column, FieldFilter, Filter, Model, PolicyModel, RuleError, RuleRow, Section,
};
pub use rulestore_store::{Database, StoreError, TableName};
pub use settings::{load_settings, load_settings_from_path, Settings, SettingsError};

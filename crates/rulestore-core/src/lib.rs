pub mod adapter;
pub mod errors;
pub mod filter;
pub mod model;
pub mod predicate;
pub mod rule;

pub use adapter::Adapter;
pub use errors::RuleError;
pub use filter::{FieldFilter, Filter};
pub use model::{load_policy_line, parse_policy_line, Model, PolicyModel};
pub use predicate::{Condition, Predicate};
pub use rule::{Column, RuleRow, Section, FIELD_COUNT};

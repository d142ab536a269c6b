//! SQL DDL for the rule table. The table name is configurable, so statements
//! are rendered per table rather than kept as constants.

use rulestore_core::Column;

use crate::error::StoreError;

pub const DEFAULT_TABLE: &str = "casbin_rule";

/// Upper bound on the length of the type tag and each value.
pub const MAX_VALUE_LEN: usize = 100;

const MAX_TABLE_NAME_LEN: usize = 64;

pub const PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;
"#;

/// A validated SQL identifier for the rule table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: &str) -> Result<Self, StoreError> {
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_head || !valid_tail || name.len() > MAX_TABLE_NAME_LEN {
            return Err(StoreError::Contract(format!("invalid table name {name:?}")));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn create_table(table: &TableName) -> String {
    let columns: Vec<String> = Column::ALL
        .iter()
        .map(|c| {
            format!(
                "    \"{c}\" VARCHAR({MAX_VALUE_LEN}) NOT NULL DEFAULT '' \
                 CHECK (length(\"{c}\") <= {MAX_VALUE_LEN})"
            )
        })
        .collect();
    let unique: Vec<String> = Column::ALL.iter().map(|c| format!("\"{c}\"")).collect();

    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\n    \
         \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n{columns}\n);\n\
         CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_uidx\" ON \"{table}\" ({unique});",
        columns = columns.join(",\n"),
        unique = unique.join(", "),
    )
}

pub fn drop_table(table: &TableName) -> String {
    format!("DROP TABLE IF EXISTS \"{table}\";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(TableName::new("casbin_rule").is_ok());
        assert!(TableName::new("_rules2").is_ok());
    }

    #[test]
    fn rejects_injection_and_junk() {
        let long = "a".repeat(65);
        for bad in ["", "1rules", "rules; DROP TABLE x", "r\"x", "räle", long.as_str()] {
            assert!(TableName::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn create_table_has_unique_index() {
        let sql = create_table(&TableName::default());
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"casbin_rule\""));
        assert!(sql.contains(
            "ON \"casbin_rule\" (\"ptype\", \"v0\", \"v1\", \"v2\", \"v3\", \"v4\", \"v5\")"
        ));
        assert!(sql.contains("CHECK (length(\"v5\") <= 100)"));
    }
}

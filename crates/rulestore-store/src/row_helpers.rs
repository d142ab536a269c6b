use rulestore_core::{Column, RuleRow, FIELD_COUNT};

use crate::error::StoreError;
use crate::schema::TableName;

/// A rule row together with its storage identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRule {
    pub id: i64,
    pub row: RuleRow,
}

/// Outcome of reading one row: either a well-formed rule or the reason it
/// could not be read. Scans keep going past bad rows.
pub type Scanned = Result<StoredRule, StoreError>;

/// `"id", "ptype", "v0", ..., "v5"`
pub fn select_columns() -> String {
    std::iter::once("\"id\"".to_string())
        .chain(Column::ALL.iter().map(|c| format!("\"{c}\"")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"ptype", "v0", ..., "v5"` for INSERT.
pub fn value_columns() -> String {
    Column::ALL
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?{first}, ..., ?{first + 6}`
pub fn placeholders(first: usize) -> String {
    (first..first + FIELD_COUNT + 1)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The seven column values of `row` in column order.
pub fn row_values(row: &RuleRow) -> [&str; FIELD_COUNT + 1] {
    Column::ALL.map(|c| row.get(c))
}

/// Read a row selected with [`select_columns`]. A missing id is a hard
/// error; anything wrong with the value columns yields a `CorruptRow`.
pub fn read_row(table: &TableName, row: &rusqlite::Row<'_>) -> rusqlite::Result<Scanned> {
    let id: i64 = row.get(0)?;
    let mut values = Vec::with_capacity(FIELD_COUNT + 1);
    for (idx, column) in Column::ALL.iter().enumerate() {
        match row.get::<_, String>(idx + 1) {
            Ok(v) => values.push(v),
            Err(e) => {
                return Ok(Err(StoreError::CorruptRow {
                    table: table.to_string(),
                    id,
                    detail: format!("{column}: {e}"),
                }))
            }
        }
    }

    let mut values = values.into_iter();
    let ptype = values.next().unwrap_or_default();
    let mut fields: [String; FIELD_COUNT] = Default::default();
    for (slot, v) in fields.iter_mut().zip(values) {
        *slot = v;
    }
    Ok(Ok(StoredRule {
        id,
        row: RuleRow { ptype, fields },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lists() {
        assert_eq!(
            select_columns(),
            "\"id\", \"ptype\", \"v0\", \"v1\", \"v2\", \"v3\", \"v4\", \"v5\""
        );
        assert_eq!(placeholders(1), "?1, ?2, ?3, ?4, ?5, ?6, ?7");
        assert_eq!(placeholders(3), "?3, ?4, ?5, ?6, ?7, ?8, ?9");
    }

    #[test]
    fn row_values_in_column_order() {
        let row = RuleRow::encode("p", &["alice", "data1"]).unwrap();
        assert_eq!(row_values(&row), ["p", "alice", "data1", "", "", "", ""]);
    }

    #[test]
    fn read_row_flags_null_value() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let table = TableName::default();
        let scanned = conn
            .query_row(
                "SELECT 7, 'p', 'alice', NULL, '', '', '', ''",
                [],
                |row| read_row(&table, row),
            )
            .unwrap();
        match scanned {
            Err(StoreError::CorruptRow { id, detail, .. }) => {
                assert_eq!(id, 7);
                assert!(detail.starts_with("v1"));
            }
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }

    #[test]
    fn read_row_builds_rule() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let table = TableName::default();
        let scanned = conn
            .query_row(
                "SELECT 1, 'g', 'alice', 'admin', '', '', '', ''",
                [],
                |row| read_row(&table, row),
            )
            .unwrap()
            .unwrap();
        assert_eq!(scanned.id, 1);
        assert_eq!(scanned.row.decode().unwrap(), vec!["alice", "admin"]);
    }
}

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info, instrument};

use rulestore_core::{Predicate, RuleRow};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::{self, Scanned, StoredRule};
use crate::schema::{self, TableName};

/// Durable operations on one rule table. Multi-statement operations run in a
/// single transaction and either fully apply or fully roll back.
pub struct RuleRepo {
    db: Database,
    table: TableName,
}

impl RuleRepo {
    pub fn new(db: Database, table: TableName) -> Self {
        Self { db, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn into_database(self) -> Database {
        self.db
    }

    /// Create the table and its uniqueness index if absent.
    #[instrument(skip(self), fields(table = %self.table))]
    pub fn ensure_table(&self) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute_batch(&schema::create_table(&self.table))
                .map_err(StoreError::schema("create table"))
        })
    }

    #[instrument(skip(self), fields(table = %self.table))]
    pub fn drop_table(&self) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute_batch(&schema::drop_table(&self.table))
                .map_err(StoreError::schema("drop table"))
        })
    }

    /// Drop, recreate and refill the table in one transaction. With no rows
    /// the table ends up empty, not absent.
    #[instrument(skip(self, rows), fields(table = %self.table, count = rows.len()))]
    pub fn replace_all(&self, rows: &[RuleRow]) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(StoreError::transaction("replace all"))?;

            tx.execute_batch(&schema::drop_table(&self.table))
                .map_err(StoreError::schema("drop table"))?;
            tx.execute_batch(&schema::create_table(&self.table))
                .map_err(StoreError::schema("create table"))?;
            if !rows.is_empty() {
                self.insert_rows(&tx, rows)
                    .map_err(StoreError::transaction("replace all"))?;
            }

            tx.commit().map_err(StoreError::transaction("replace all"))?;
            info!(count = rows.len(), "rule table replaced");
            Ok(())
        })
    }

    /// Every row, in storage order.
    #[instrument(skip(self), fields(table = %self.table))]
    pub fn select_all(&self) -> Result<Vec<Scanned>, StoreError> {
        self.db.with_conn(|conn| {
            self.select_where(conn, None)
                .map_err(StoreError::statement("select rules"))
        })
    }

    /// Rows matching `predicate`, in storage order.
    #[instrument(skip(self, predicate), fields(table = %self.table))]
    pub fn select_filtered(&self, predicate: &Predicate) -> Result<Vec<Scanned>, StoreError> {
        require_constrained(predicate, "select")?;
        self.db.with_conn(|conn| {
            self.select_where(conn, Some(predicate))
                .map_err(StoreError::statement("select filtered rules"))
        })
    }

    #[instrument(skip(self, row), fields(table = %self.table, ptype = %row.ptype))]
    pub fn insert_one(&self, row: &RuleRow) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            self.insert_rows(conn, std::slice::from_ref(row))
                .map_err(StoreError::statement("insert rule"))
        })
    }

    /// Insert `rows` one statement each inside one transaction. The first
    /// failure rolls back the whole batch.
    #[instrument(skip(self, rows), fields(table = %self.table, count = rows.len()))]
    pub fn insert_many(&self, rows: &[RuleRow]) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(StoreError::transaction("insert rules"))?;
            self.insert_rows(&tx, rows)
                .map_err(StoreError::transaction("insert rules"))?;
            tx.commit().map_err(StoreError::transaction("insert rules"))
        })?;
        debug!(inserted = rows.len(), "rules inserted");
        Ok(())
    }

    /// Delete rows matching `predicate`. Returns the number removed.
    #[instrument(skip(self, predicate), fields(table = %self.table))]
    pub fn delete_one(&self, predicate: &Predicate) -> Result<usize, StoreError> {
        require_constrained(predicate, "delete")?;
        let removed = self.db.with_conn(|conn| {
            self.delete_where(conn, predicate)
                .map_err(StoreError::statement("delete rules"))
        })?;
        debug!(removed, "rules deleted");
        Ok(removed)
    }

    /// Apply each delete predicate in one transaction; all or nothing.
    #[instrument(skip(self, predicates), fields(table = %self.table, count = predicates.len()))]
    pub fn delete_many(&self, predicates: &[Predicate]) -> Result<usize, StoreError> {
        for predicate in predicates {
            require_constrained(predicate, "delete")?;
        }
        let removed = self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(StoreError::transaction("delete rules"))?;
            let mut removed = 0;
            for predicate in predicates {
                removed += self
                    .delete_where(&tx, predicate)
                    .map_err(StoreError::transaction("delete rules"))?;
            }
            tx.commit().map_err(StoreError::transaction("delete rules"))?;
            Ok(removed)
        })?;
        debug!(removed, "rules deleted");
        Ok(removed)
    }

    /// Overwrite every column of the rows matching `predicate` with `new_row`.
    /// Returns the number of rows changed.
    #[instrument(skip(self, predicate, new_row), fields(table = %self.table))]
    pub fn update_one(&self, predicate: &Predicate, new_row: &RuleRow) -> Result<usize, StoreError> {
        require_constrained(predicate, "update")?;
        let changed = self.db.with_conn(|conn| {
            self.update_where(conn, predicate, new_row)
                .map_err(StoreError::statement("update rule"))
        })?;
        debug!(changed, "rules updated");
        Ok(changed)
    }

    /// Pairwise updates in one transaction; any failure aborts the batch.
    #[instrument(skip(self, pairs), fields(table = %self.table, count = pairs.len()))]
    pub fn update_many(&self, pairs: &[(Predicate, RuleRow)]) -> Result<usize, StoreError> {
        for (predicate, _) in pairs {
            require_constrained(predicate, "update")?;
        }
        let changed = self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(StoreError::transaction("update rules"))?;
            let mut changed = 0;
            for (predicate, new_row) in pairs {
                changed += self
                    .update_where(&tx, predicate, new_row)
                    .map_err(StoreError::transaction("update rules"))?;
            }
            tx.commit().map_err(StoreError::transaction("update rules"))?;
            Ok(changed)
        })?;
        debug!(changed, "rules updated");
        Ok(changed)
    }

    /// Inside one transaction: snapshot the rows matching `predicate`, delete
    /// exactly those rows by id, insert `new_rows`. Returns the snapshot.
    #[instrument(skip(self, predicate, new_rows), fields(table = %self.table, count = new_rows.len()))]
    pub fn replace_filtered(
        &self,
        predicate: &Predicate,
        new_rows: &[RuleRow],
    ) -> Result<Vec<StoredRule>, StoreError> {
        require_constrained(predicate, "replace")?;
        let snapshot = self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(StoreError::transaction("replace filtered"))?;

            let snapshot = self
                .select_where(&tx, Some(predicate))
                .map_err(StoreError::transaction("replace filtered"))?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;

            {
                let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = ?1", self.table);
                let mut stmt = tx
                    .prepare(&sql)
                    .map_err(StoreError::transaction("replace filtered"))?;
                for old in &snapshot {
                    stmt.execute([old.id])
                        .map_err(StoreError::transaction("replace filtered"))?;
                }
            }

            self.insert_rows(&tx, new_rows)
                .map_err(StoreError::transaction("replace filtered"))?;

            tx.commit()
                .map_err(StoreError::transaction("replace filtered"))?;
            Ok(snapshot)
        })?;
        debug!(replaced = snapshot.len(), inserted = new_rows.len(), "filtered rules replaced");
        Ok(snapshot)
    }

    fn select_where(
        &self,
        conn: &Connection,
        predicate: Option<&Predicate>,
    ) -> rusqlite::Result<Vec<Scanned>> {
        let mut sql = format!(
            "SELECT {} FROM \"{}\"",
            row_helpers::select_columns(),
            self.table
        );
        let args = match predicate {
            Some(p) => {
                let (clause, args) = p.to_sql(1);
                sql.push_str(" WHERE ");
                sql.push_str(&clause);
                args
            }
            None => Vec::new(),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                row_helpers::read_row(&self.table, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_rows(&self, conn: &Connection, rows: &[RuleRow]) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            row_helpers::value_columns(),
            row_helpers::placeholders(1)
        );
        let mut stmt = conn.prepare(&sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row_helpers::row_values(row)))?;
        }
        Ok(())
    }

    fn delete_where(&self, conn: &Connection, predicate: &Predicate) -> rusqlite::Result<usize> {
        let (clause, args) = predicate.to_sql(1);
        let sql = format!("DELETE FROM \"{}\" WHERE {clause}", self.table);
        conn.execute(&sql, params_from_iter(args))
    }

    fn update_where(
        &self,
        conn: &Connection,
        predicate: &Predicate,
        new_row: &RuleRow,
    ) -> rusqlite::Result<usize> {
        let assignments = rulestore_core::Column::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{c}\" = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let values = row_helpers::row_values(new_row);
        let (clause, args) = predicate.to_sql(values.len() + 1);
        let sql = format!(
            "UPDATE \"{}\" SET {assignments} WHERE {clause}",
            self.table
        );
        conn.execute(&sql, params_from_iter(values.into_iter().chain(args)))
    }
}

fn require_constrained(predicate: &Predicate, op: &str) -> Result<(), StoreError> {
    if predicate.is_unconstrained() {
        return Err(StoreError::Contract(format!(
            "refusing to {op} with an empty predicate"
        )));
    }
    Ok(())
}

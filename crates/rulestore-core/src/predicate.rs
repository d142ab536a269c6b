//! `WHERE` clause construction over the seven rule columns.
//!
//! Predicates are plain data: an ordered conjunction of per-column
//! conditions. Rendering to SQL is deterministic (columns always appear in
//! `ptype, v0..v5` order) and numbers placeholders from a caller-chosen start
//! so a predicate can follow other bound parameters in the same statement.

use crate::errors::RuleError;
use crate::filter::{FieldFilter, Filter};
use crate::rule::{Column, RuleRow};

/// Constraint on one column: equality for a single value, `IN` for several.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub column: Column,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// Equality on all seven columns, empty slots included. Matches only rows
    /// of exactly the same arity.
    pub fn exact(row: &RuleRow) -> Self {
        let conditions = Column::ALL
            .iter()
            .map(|&column| Condition {
                column,
                values: vec![row.get(column).to_string()],
            })
            .collect();
        Self { conditions }
    }

    /// Equality on the type tag plus every non-empty slot of `row`; empty slots
    /// are left unconstrained.
    pub fn sparse(row: &RuleRow) -> Self {
        let conditions = Column::ALL
            .iter()
            .filter(|&&column| !row.get(column).is_empty())
            .map(|&column| Condition {
                column,
                values: vec![row.get(column).to_string()],
            })
            .collect();
        Self { conditions }
    }

    /// Type tag equality plus the slots selected by `fields`.
    pub fn selection(ptype: &str, fields: &FieldFilter) -> Result<Self, RuleError> {
        if ptype.is_empty() {
            return Err(RuleError::EmptyPolicyType);
        }
        let mut row = RuleRow {
            ptype: ptype.to_string(),
            ..RuleRow::default()
        };
        for (index, value) in fields.constrained() {
            row.fields[index] = value.to_string();
        }
        Ok(Self::sparse(&row))
    }

    /// Multi-valued filter: no constraint for an empty candidate set,
    /// equality for one candidate, `IN` for several.
    pub fn filter(filter: &Filter) -> Result<Self, RuleError> {
        if filter.is_unconstrained() {
            return Err(RuleError::UnconstrainedFilter);
        }
        let conditions = Column::ALL
            .iter()
            .filter(|&&column| !filter.values(column).is_empty())
            .map(|&column| Condition {
                column,
                values: filter.values(column).to_vec(),
            })
            .collect();
        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// An empty conjunction. Storage must treat this as "no filter", never
    /// as match-all or match-none.
    pub fn is_unconstrained(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as SQL with numbered placeholders starting at `?{first}`.
    /// Returns the clause and the bound values in placeholder order.
    pub fn to_sql(&self, first: usize) -> (String, Vec<&str>) {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut args = Vec::new();

        for cond in &self.conditions {
            let mut placeholders = Vec::with_capacity(cond.values.len());
            for value in &cond.values {
                placeholders.push(format!("?{}", first + args.len()));
                args.push(value.as_str());
            }
            let clause = match placeholders.as_slice() {
                [one] => format!("\"{}\" = {one}", cond.column),
                many => format!("\"{}\" IN ({})", cond.column, many.join(", ")),
            };
            clauses.push(clause);
        }

        (clauses.join(" AND "), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_covers_every_column() {
        let row = RuleRow::encode("p", &["alice", "data1", "read"]).unwrap();
        let pred = Predicate::exact(&row);
        let (sql, args) = pred.to_sql(1);
        assert_eq!(
            sql,
            "\"ptype\" = ?1 AND \"v0\" = ?2 AND \"v1\" = ?3 AND \"v2\" = ?4 \
             AND \"v3\" = ?5 AND \"v4\" = ?6 AND \"v5\" = ?7"
        );
        assert_eq!(args, vec!["p", "alice", "data1", "read", "", "", ""]);
    }

    #[test]
    fn sparse_skips_empty_slots() {
        let mut row = RuleRow::encode("p", &["bob"]).unwrap();
        row.fields[2] = "write".into();
        let pred = Predicate::sparse(&row);
        let (sql, args) = pred.to_sql(1);
        assert_eq!(sql, "\"ptype\" = ?1 AND \"v0\" = ?2 AND \"v2\" = ?3");
        assert_eq!(args, vec!["p", "bob", "write"]);
    }

    #[test]
    fn sparse_of_empty_row_is_unconstrained() {
        let pred = Predicate::sparse(&RuleRow::default());
        assert!(pred.is_unconstrained());
        assert_eq!(pred.to_sql(1), (String::new(), Vec::new()));
    }

    #[test]
    fn selection_uses_offsets() {
        let fields = FieldFilter::from_offset(1, &["data2", "write"]).unwrap();
        let pred = Predicate::selection("p", &fields).unwrap();
        let (sql, args) = pred.to_sql(1);
        assert_eq!(sql, "\"ptype\" = ?1 AND \"v1\" = ?2 AND \"v2\" = ?3");
        assert_eq!(args, vec!["p", "data2", "write"]);
    }

    #[test]
    fn selection_requires_ptype() {
        let fields = FieldFilter::new();
        assert_eq!(
            Predicate::selection("", &fields),
            Err(RuleError::EmptyPolicyType)
        );
    }

    #[test]
    fn filter_uses_in_for_multiple_values() {
        let filter = Filter::new()
            .with(Column::PType, ["p"])
            .with(Column::V0, ["bob", "data2_admin"])
            .with(Column::V2, ["read", "write"]);
        let pred = Predicate::filter(&filter).unwrap();
        let (sql, args) = pred.to_sql(1);
        assert_eq!(
            sql,
            "\"ptype\" = ?1 AND \"v0\" IN (?2, ?3) AND \"v2\" IN (?4, ?5)"
        );
        assert_eq!(args, vec!["p", "bob", "data2_admin", "read", "write"]);
    }

    #[test]
    fn filter_rejects_unconstrained() {
        assert_eq!(
            Predicate::filter(&Filter::new()),
            Err(RuleError::UnconstrainedFilter)
        );
    }

    #[test]
    fn placeholders_start_at_offset() {
        let row = RuleRow::encode("g", &["alice", "admin"]).unwrap();
        let pred = Predicate::sparse(&row);
        let (sql, _) = pred.to_sql(8);
        assert_eq!(sql, "\"ptype\" = ?8 AND \"v0\" = ?9 AND \"v1\" = ?10");
    }
}

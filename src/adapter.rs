use tracing::{info, instrument, warn};

use rulestore_core::{
    Adapter, FieldFilter, Filter, Model, Predicate, RuleError, RuleRow, Section,
};
use rulestore_store::{Database, RuleRepo, Scanned, StoreError, TableName};

use crate::settings::Settings;

/// Policy adapter over a SQLite rule table.
///
/// Construction pings the database and creates the table if needed; no
/// adapter exists for an unreachable store. Dropping the adapter releases the
/// connection handle, [`SqliteAdapter::close`] does the same and reports
/// close errors.
pub struct SqliteAdapter {
    repo: RuleRepo,
    filtered: bool,
}

impl SqliteAdapter {
    /// Adapter over the default `casbin_rule` table.
    pub fn new(db: Database) -> Result<Self, StoreError> {
        Self::with_table(db, TableName::default())
    }

    #[instrument(skip(db), fields(path = %db.path().display(), table = %table))]
    pub fn with_table(db: Database, table: TableName) -> Result<Self, StoreError> {
        db.ping()?;
        let repo = RuleRepo::new(db, table);
        repo.ensure_table()?;
        info!("policy adapter ready");
        Ok(Self {
            repo,
            filtered: false,
        })
    }

    /// Open the database described by `settings` and build an adapter on it.
    pub fn from_settings(settings: &Settings) -> Result<Self, StoreError> {
        let db = Database::open(&settings.database.path(), settings.database.busy_timeout())?;
        let table = TableName::new(&settings.database.table_name)?;
        Self::with_table(db, table)
    }

    pub fn table(&self) -> &TableName {
        self.repo.table()
    }

    /// Release the storage handle now instead of at drop.
    pub fn close(self) -> Result<(), StoreError> {
        self.repo.into_database().close()
    }

    fn load_rows(&self, rows: Vec<Scanned>, model: &mut dyn Model) {
        for scanned in rows {
            match scanned {
                Ok(stored) => load_row(&stored.row, model),
                Err(e) => warn!(error = %e, kind = e.error_kind(), "skipping unreadable rule row"),
            }
        }
    }
}

/// Insert a decoded row into `model`. Rows that cannot become a rule are
/// logged and skipped.
fn load_row(row: &RuleRow, model: &mut dyn Model) {
    let Some(rule) = row.decode() else {
        warn!(ptype = %row.ptype, "skipping rule row with no values");
        return;
    };
    match Section::of(&row.ptype) {
        Ok(section) => {
            model.add_rule(section, &row.ptype, rule);
        }
        Err(e) => warn!(error = %e, "skipping rule row"),
    }
}

fn encode_all(ptype: &str, rules: &[Vec<String>]) -> Result<Vec<RuleRow>, RuleError> {
    rules.iter().map(|r| RuleRow::encode(ptype, r)).collect()
}

impl Adapter for SqliteAdapter {
    type Error = StoreError;

    #[instrument(skip_all, fields(table = %self.repo.table()))]
    fn load_policy(&mut self, model: &mut dyn Model) -> Result<(), StoreError> {
        let rows = self.repo.select_all()?;
        self.load_rows(rows, model);
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table()))]
    fn load_filtered_policy(
        &mut self,
        model: &mut dyn Model,
        filter: &Filter,
    ) -> Result<(), StoreError> {
        let predicate = Predicate::filter(filter)?;
        let rows = self.repo.select_filtered(&predicate)?;
        self.load_rows(rows, model);
        self.filtered = true;
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    #[instrument(skip_all, fields(table = %self.repo.table()))]
    fn save_policy(&mut self, model: &dyn Model) -> Result<(), StoreError> {
        let mut rows = Vec::new();
        for section in Section::ALL {
            for (ptype, rules) in model.rule_sets(section) {
                rows.extend(encode_all(ptype, rules)?);
            }
        }
        self.repo.replace_all(&rows)
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype))]
    fn add_policy(&mut self, _sec: Section, ptype: &str, rule: &[String]) -> Result<(), StoreError> {
        let row = RuleRow::encode(ptype, rule)?;
        self.repo.insert_one(&row)
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype, count = rules.len()))]
    fn add_policies(
        &mut self,
        _sec: Section,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let rows = encode_all(ptype, rules)?;
        self.repo.insert_many(&rows)
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype))]
    fn remove_policy(
        &mut self,
        _sec: Section,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), StoreError> {
        let row = RuleRow::encode(ptype, rule)?;
        self.repo.delete_one(&Predicate::exact(&row))?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype, count = rules.len()))]
    fn remove_policies(
        &mut self,
        _sec: Section,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let predicates: Vec<Predicate> = encode_all(ptype, rules)?
            .iter()
            .map(Predicate::exact)
            .collect();
        self.repo.delete_many(&predicates)?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype))]
    fn remove_filtered(
        &mut self,
        _sec: Section,
        ptype: &str,
        fields: &FieldFilter,
    ) -> Result<(), StoreError> {
        let predicate = Predicate::selection(ptype, fields)?;
        self.repo.delete_one(&predicate)?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype))]
    fn update_policy(
        &mut self,
        _sec: Section,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<(), StoreError> {
        let old = RuleRow::encode(ptype, old_rule)?;
        let new = RuleRow::encode(ptype, new_rule)?;
        self.repo.update_one(&Predicate::exact(&old), &new)?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype, count = old_rules.len()))]
    fn update_policies(
        &mut self,
        _sec: Section,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<(), StoreError> {
        if old_rules.len() != new_rules.len() {
            return Err(RuleError::BatchMismatch {
                old: old_rules.len(),
                new: new_rules.len(),
            }
            .into());
        }
        let pairs = old_rules
            .iter()
            .zip(new_rules)
            .map(|(old, new)| -> Result<_, RuleError> {
                let old = RuleRow::encode(ptype, old)?;
                Ok((Predicate::exact(&old), RuleRow::encode(ptype, new)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.repo.update_many(&pairs)?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.repo.table(), ptype = %ptype, count = new_rules.len()))]
    fn update_filtered(
        &mut self,
        _sec: Section,
        ptype: &str,
        new_rules: &[Vec<String>],
        fields: &FieldFilter,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let predicate = Predicate::selection(ptype, fields)?;
        let rows = encode_all(ptype, new_rules)?;
        let replaced = self.repo.replace_filtered(&predicate, &rows)?;
        Ok(replaced
            .into_iter()
            .map(|stored| stored.row.into_values())
            .collect())
    }
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use rulestore::{
    load_settings, load_settings_from_path, Adapter, Column, FieldFilter, Filter, Model,
    PolicyModel, RuleRow, Section, SqliteAdapter,
};

#[derive(Parser)]
#[command(name = "rulestore", about = "Manage policy rules stored in SQLite")]
struct Cli {
    /// Settings file (defaults to ~/.rulestore/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding settings.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Rule table name, overriding settings.
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace every stored rule with the contents of a policy file.
    Import { file: PathBuf },
    /// Print stored rules as policy lines, optionally filtered.
    Export(ExportArgs),
    /// Add one rule.
    Add { ptype: String, values: Vec<String> },
    /// Remove one rule, matched exactly.
    Remove { ptype: String, values: Vec<String> },
    /// Remove every rule whose values starting at `--offset` match.
    RemoveFiltered {
        ptype: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        values: Vec<String>,
    },
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long)]
    ptype: Vec<String>,
    #[arg(long)]
    v0: Vec<String>,
    #[arg(long)]
    v1: Vec<String>,
    #[arg(long)]
    v2: Vec<String>,
    #[arg(long)]
    v3: Vec<String>,
    #[arg(long)]
    v4: Vec<String>,
    #[arg(long)]
    v5: Vec<String>,
}

impl ExportArgs {
    fn filter(self) -> Filter {
        Filter::new()
            .with(Column::PType, self.ptype)
            .with(Column::V0, self.v0)
            .with(Column::V1, self.v1)
            .with(Column::V2, self.v2)
            .with(Column::V3, self.v3)
            .with(Column::V4, self.v4)
            .with(Column::V5, self.v5)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("loading settings")?;
    if let Some(db) = &cli.db {
        settings.database.path = db.display().to_string();
    }
    if let Some(table) = &cli.table {
        settings.database.table_name = table.clone();
    }

    let telemetry = settings.logging.telemetry()?;
    rulestore_telemetry::init_telemetry(&telemetry)?;

    let mut adapter = SqliteAdapter::from_settings(&settings).with_context(|| {
        format!("opening {}", settings.database.path().display())
    })?;

    match cli.command {
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut model = PolicyModel::new();
            for (lineno, line) in content.lines().enumerate() {
                rulestore_core::load_policy_line(line, &mut model)
                    .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
            }
            adapter.save_policy(&model).context("saving policy")?;
            tracing::info!(rules = model.len(), "policy imported");
        }
        Command::Export(args) => {
            let filter = args.filter();
            let mut model = PolicyModel::new();
            if filter.is_unconstrained() {
                adapter.load_policy(&mut model)?;
            } else {
                adapter.load_filtered_policy(&mut model, &filter)?;
            }
            for section in Section::ALL {
                for (ptype, rules) in model.rule_sets(section) {
                    for rule in rules {
                        if let Some(line) = RuleRow::encode(ptype, rule)?.to_line() {
                            println!("{line}");
                        }
                    }
                }
            }
        }
        Command::Add { ptype, values } => {
            adapter.add_policy(Section::of(&ptype)?, &ptype, &values)?;
        }
        Command::Remove { ptype, values } => {
            adapter.remove_policy(Section::of(&ptype)?, &ptype, &values)?;
        }
        Command::RemoveFiltered {
            ptype,
            offset,
            values,
        } => {
            let fields = FieldFilter::from_offset(offset, &values)?;
            adapter.remove_filtered(Section::of(&ptype)?, &ptype, &fields)?;
        }
    }

    adapter.close()?;
    Ok(())
}

use rulestore_core::RuleError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database unreachable: {0}")]
    Connection(String),

    #[error("schema error during {op}: {source}")]
    Schema {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{op} failed: {source}")]
    Statement {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{op} rolled back: {source}")]
    Transaction {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("corrupt row {id} in {table}: {detail}")]
    CorruptRow {
        table: String,
        id: i64,
        detail: String,
    },

    #[error("contract violation: {0}")]
    Contract(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("IO error: {0}")]
    Io(String),
}

impl StoreError {
    pub(crate) fn schema(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Schema { op, source }
    }

    pub(crate) fn statement(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Statement { op, source }
    }

    pub(crate) fn transaction(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Transaction { op, source }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Schema { .. } => "schema",
            Self::Statement { .. } => "statement",
            Self::Transaction { .. } => "transaction",
            Self::CorruptRow { .. } => "decode",
            Self::Contract(_) | Self::Rule(_) => "contract",
            Self::Io(_) => "io",
        }
    }
}

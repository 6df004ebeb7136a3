use thiserror::Error;

use crate::expr::Qualifier;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An expression referenced a column absent from the data it was evaluated against.
    #[error("missing column '{}'", display_column(.qualifier, .name))]
    MissingColumn { name: String, qualifier: Qualifier },

    /// Row-major batch construction found rows with different field sets.
    #[error("heterogeneous rows: field '{field}' is not present in every row (row {row})")]
    HeterogeneousRows { field: String, row: usize },

    #[error("column '{column}' has {actual} values, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("length mismatch in elementwise operation: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("cannot take {func} of an empty list")]
    EmptyAggregate { func: &'static str },

    #[error("expression id {0} is not part of this arena")]
    UnknownExpr(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn display_column(qualifier: &Qualifier, name: &str) -> String {
    match qualifier.prefix() {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    }
}

impl Error {
    pub fn missing_column(name: impl Into<String>, qualifier: Qualifier) -> Self {
        Error::MissingColumn {
            name: name.into(),
            qualifier,
        }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch(msg.into())
    }

    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use quarry_core::error::Error;
    /// use quarry_core::expr::Qualifier;
    /// let err = Error::missing_column("price", Qualifier::None);
    /// let err = err.with_context("while executing select");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::MissingColumn { qualifier, .. } => {
                let mut out = vec![
                    "Check that the column name is spelled correctly".into(),
                    "Verify the column exists in the source node's projection".into(),
                ];
                if qualifier.is_qualified() {
                    out.push("Check that the column is qualified with the correct join side".into());
                }
                out
            }
            Error::HeterogeneousRows { .. } => {
                vec!["Every row passed to Batch::from_rows must have the same field names".into()]
            }
            Error::TypeMismatch(_) | Error::EmptyAggregate { .. } => {
                vec!["max/min reduce list-valued cells; arithmetic needs numeric operands".into()]
            }
            Error::Context { source, .. } => match source.downcast_ref::<Error>() {
                Some(inner) => inner.suggestions(),
                None => vec![],
            },
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

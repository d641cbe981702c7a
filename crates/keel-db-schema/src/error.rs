use thiserror::Error;

/// A malformed entity declaration.
///
/// These indicate a bug in how entities are declared, not a problem with the
/// data or the database, and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("entity `{table}`: foreign key on property `{property}` has no column descriptor")]
    MissingForeignKeyColumn { table: String, property: String },

    #[error("entity `{table}`: vector column `{property}` has no column descriptor")]
    MissingVectorColumn { table: String, property: String },

    #[error("entity `{table}`: column `{property}` is marked as a vector but has no dimensions")]
    VectorColumnWithoutDimensions { table: String, property: String },

    #[error("table `{table}` is declared by both `{first}` and `{second}`")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid entity declaration: {0}")]
    Configuration(#[from] keel_db_schema::ConfigError),

    #[error("schema introspection failed while reading {step}: {source}")]
    Introspection {
        step: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("migration script failed: {0}")]
    Execution(#[source] tokio_postgres::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

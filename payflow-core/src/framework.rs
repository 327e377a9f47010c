use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Schema migrations, embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

pub trait DatabaseAccessor {
    fn acquire(&mut self) -> impl sqlx::SqliteExecutor<'_>;
}

#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: SqlitePool,
}

pub struct TransactionProcessor<'b> {
    pub tx: sqlx::Transaction<'b, sqlx::Sqlite>,
}

impl DatabaseAccessor for DatabaseProcessor {
    fn acquire(&mut self) -> impl sqlx::SqliteExecutor<'_> {
        &self.pool
    }
}

impl<'b> DatabaseAccessor for TransactionProcessor<'b> {
    fn acquire(&mut self) -> impl sqlx::SqliteExecutor<'_> {
        &mut *self.tx
    }
}

/// Open a pool for `url`, creating the database file if needed.
///
/// In-memory databases are limited to a single connection that is never
/// recycled, otherwise every new connection would see an empty database.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    pool_options.connect_with(options).await
}

/// Open a pool and bring the schema up to date.
pub async fn connect_and_migrate(
    url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::migrate::MigrateError> {
    let pool = connect_pool(url, max_connections).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

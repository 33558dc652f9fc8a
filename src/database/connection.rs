use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{info, trace, trace_span};

use crate::error::{ServiceError, ServiceResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbConnection = SqliteConnection;
pub type DbPool = Pool<ConnectionManager<DbConnection>>;

/// Applied to every connection the pool opens. SQLite keeps foreign key
/// enforcement off unless asked per connection.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<DbConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, connection: &mut DbConnection) -> Result<(), diesel::r2d2::Error> {
        connection
            .batch_execute(
                "PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;",
            )
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn establish_pooled_connection(database_url: &str, max_size: u32) -> ServiceResult<DbPool> {
    let span = trace_span!("establishing pooled connection");
    let _guard = span.enter();

    trace!("Creating manager");
    let manager = ConnectionManager::<DbConnection>::new(database_url);

    trace!("Creating pool");
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?;

    run_migrations(&pool)?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> ServiceResult<()> {
    let mut connection = pool.get()?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| ServiceError::Migration(error.to_string()))?;

    if !applied.is_empty() {
        info!(count = applied.len(), "Applied pending migrations");
    }

    Ok(())
}

/// Schema migrations
///
/// Migrations are embedded at compile time from `taskive-shared/migrations/`
/// and applied in version order. The schema has no `ON DELETE CASCADE`;
/// deletions go through [`Store::run_cascade`](crate::store::Store::run_cascade).

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Creates the database named in `database_url` if it is missing
///
/// Meant for local development; production databases are provisioned ahead
/// of time and this is a no-op there.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
    } else {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

/// PostgreSQL plumbing
///
/// - `pool`: connection pool creation, health check and shutdown
/// - `migrations`: embedded sqlx migrations and database bootstrap
///
/// The queries themselves live next to their rows in `models`, and are
/// reached through [`PgStore`](crate::store::postgres::PgStore).
///
/// # Example
///
/// ```no_run
/// use taskive_shared::db::{migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let url = std::env::var("DATABASE_URL")?;
///     migrations::ensure_database_exists(&url).await?;
///
///     let pool = create_pool(DatabaseConfig::new(url)).await?;
///     migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

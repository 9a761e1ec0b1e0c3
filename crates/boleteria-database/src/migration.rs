//! Embedded schema migrations.

use sqlx::PgPool;
use tracing::info;

use boleteria_core::error::{AppError, ErrorKind};

/// Migrations compiled in from the workspace `migrations/` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Bring the schema up to date. Safe to run on every startup; already
/// applied migrations are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Schema migration failed: {e}"),
            e,
        )
    })?;

    info!("Schema up to date");
    Ok(())
}

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::Config, error::QueryError};

pub async fn connect(config: &Config) -> Result<PgPool, QueryError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!(
        "Connected to database with {} max connections",
        config.database_max_connections
    );

    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::new(format!("Migration failed: {e}")))?;

    log::info!("Database migrations applied");
    Ok(())
}

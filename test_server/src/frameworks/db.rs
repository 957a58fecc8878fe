use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::frameworks::config;

// Build a small PostgreSQL pool for the catalog.
pub async fn connect_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config::DB_MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

// Run database migrations for the catalog tables.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
    MIGRATOR.run(pool).await
}

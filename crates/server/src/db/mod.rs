//! Database module for the Ghost Pass server
//!
//! One PostgreSQL database (`ghostpass`) holds every table. The pool is
//! constructed here and handed to [`crate::state::AppState`]; nothing in
//! the codebase reaches for a process-global client.

pub mod queries;
pub mod schema;

use anyhow::Result;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

pub type DbPool = Pool;

/// Initialize the server database.
/// Creates the `ghostpass` database if it doesn't exist, then runs
/// migrations.
pub async fn init_db(base_url: &str) -> Result<DbPool> {
    let db_name = "ghostpass";

    // Strip trailing database name if present (e.g., /postgres)
    let base_url = base_url
        .trim_end_matches(|c: char| c != '/')
        .trim_end_matches('/');

    // Connect to the postgres database to create ours if needed
    let admin_pool = create_pool(&format!("{}/postgres", base_url)).await?;
    let admin_client = admin_pool.get().await?;

    let row = admin_client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&db_name])
        .await?;

    if row.is_none() {
        admin_client
            .execute(&format!("CREATE DATABASE {}", db_name), &[])
            .await?;
        info!("Created database: {}", db_name);
    }

    let server_url = format!("{}/{}", base_url, db_name);
    let pool = create_pool(&server_url).await?;

    let client = pool.get().await?;
    schema::run_migrations(&client).await?;

    info!("Server database initialized: {}", db_name);
    Ok(pool)
}

async fn create_pool(database_url: &str) -> Result<DbPool> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(pool)
}

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod events;

pub use events::EventStore;

/// Opens the pool and brings the schema up to date.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that the pool never retires.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    tracing::info!("Successfully connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations run successfully");

    Ok(pool)
}

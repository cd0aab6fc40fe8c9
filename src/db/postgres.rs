use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

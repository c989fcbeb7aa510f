use crate::config::Config;
use sqlx::PgPool;

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = store::connect(&config.database.url, config.database.max_connections).await?;
    Ok(pool)
}

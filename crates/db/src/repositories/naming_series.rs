use super::{NamingSeriesRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNamingSeriesRepository {
    pool: DbPool,
}

impl SqlNamingSeriesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_counter(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|e| RepositoryError::decode("current", e))
}

#[async_trait::async_trait]
impl NamingSeriesRepository for SqlNamingSeriesRepository {
    async fn next_value(&self, prefix: &str) -> Result<u64, RepositoryError> {
        // One upsert per allocation; the counter is never read and written separately.
        let current: i64 = sqlx::query_scalar(
            "INSERT INTO naming_series (prefix, current) VALUES (?, 1)
             ON CONFLICT(prefix) DO UPDATE SET current = current + 1
             RETURNING current",
        )
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;

        to_counter(current)
    }
}

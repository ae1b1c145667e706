use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Rows the demo dataset guarantees, as `(table, key column, key)`.
const SEED_CONTRACT: &[(&str, &str, &str)] = &[
    ("brand", "name", "Acme"),
    ("item_group", "name", "Panels"),
    ("item_group", "name", "Acoustic Panels"),
    ("item", "code", "ACME-PNL-001"),
    ("item", "code", "MTR-PNL-001"),
    ("item", "code", "MTR-FRM-001"),
    ("item", "code", "SRV-001"),
    ("opportunity", "name", "OPP-2026-00001"),
    ("work_order", "name", "WO-00001"),
    ("pick_list", "name", "PICK-00001"),
];

/// Tables the dataset writes to, children before parents.
const SEED_TABLES: &[&str] = &[
    "pick_list",
    "work_order",
    "opportunity",
    "purchase_invoice_item",
    "bin",
    "item_price",
    "naming_series",
    "item",
    "item_group_defaults",
    "item_group",
    "item_type",
    "brand",
];

/// Demo masters, prices and documents for local runs and end-to-end checks.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult { rows_checked: SEED_CONTRACT.len() })
    }

    /// Every contract row present, with its check result.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_CONTRACT.len());
        for (table, column, key) in SEED_CONTRACT {
            let present: i64 = sqlx::query_scalar(&format!(
                "SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = ?1)"
            ))
            .bind(key)
            .fetch_one(pool)
            .await?;
            checks.push((*key, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for table in SEED_TABLES {
            tx.execute(sqlx::query(&format!("DELETE FROM {table}"))).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub rows_checked: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Versions recorded as applied, oldest first.
pub async fn applied_versions(pool: &DbPool) -> Result<Vec<i64>, sqlx::Error> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if table_exists == 0 {
        return Ok(Vec::new());
    }

    sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1 ORDER BY version")
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::{applied_versions, run_pending};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const DOCUMENT_TABLES: &[&str] = &[
        "brand",
        "item_type",
        "item_group",
        "item_group_defaults",
        "item_group_default",
        "item",
        "naming_series",
        "item_price",
        "bin",
        "stock_ledger_entry",
        "purchase_invoice_item",
        "purchase_receipt_item",
        "opportunity",
        "costing_note",
        "boq",
        "work_order",
        "pick_list",
        "stock_entry",
    ];

    async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
        let mut names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\'
               AND name != 'sqlite_sequence'",
        )
        .fetch_all(pool)
        .await
        .expect("list tables");
        names.sort();
        names
    }

    #[tokio::test]
    async fn migrations_create_document_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let names = table_names(&pool).await;
        for table in DOCUMENT_TABLES {
            assert!(names.iter().any(|name| name == table), "missing table {table}");
        }
        assert_eq!(applied_versions(&pool).await.expect("versions"), vec![1]);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert!(table_names(&pool).await.is_empty(), "all managed tables should be dropped");

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(table_names(&pool).await.len(), DOCUMENT_TABLES.len());
    }

    #[tokio::test]
    async fn fresh_database_reports_no_versions() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert!(applied_versions(&pool).await.expect("versions").is_empty());
    }
}

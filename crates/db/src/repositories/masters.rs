use tracing::debug;

use tally_core::domain::item::{Brand, ItemGroup, ItemTypeRecord};

use super::{get, MasterDataRepository, RepositoryError};
use crate::DbPool;

/// Current group defaults table first, then the singular name older installs used.
const GROUP_DEFAULT_TABLES: [&str; 2] = ["item_group_defaults", "item_group_default"];

pub struct SqlMasterDataRepository {
    pool: DbPool,
}

impl SqlMasterDataRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn default_from_table(
        &self,
        table: &str,
        item_group: &str,
        company: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        if let Some(company) = company {
            let for_company: Option<Option<String>> = sqlx::query_scalar(&format!(
                "SELECT default_warehouse FROM {table}
                 WHERE item_group = ? AND company = ? ORDER BY id LIMIT 1"
            ))
            .bind(item_group)
            .bind(company)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(Some(warehouse)) = for_company {
                return Ok(Some(warehouse));
            }
        }

        let any_row: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT default_warehouse FROM {table} WHERE item_group = ? ORDER BY id LIMIT 1"
        ))
        .bind(item_group)
        .fetch_optional(&self.pool)
        .await?;
        Ok(any_row.flatten())
    }
}

#[async_trait::async_trait]
impl MasterDataRepository for SqlMasterDataRepository {
    async fn brand(&self, name: &str) -> Result<Option<Brand>, RepositoryError> {
        let row = sqlx::query("SELECT name, abbreviation FROM brand WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(Brand { name: get(r, "name")?, abbreviation: get(r, "abbreviation")? })),
            None => Ok(None),
        }
    }

    async fn item_type(&self, name: &str) -> Result<Option<ItemTypeRecord>, RepositoryError> {
        let row = sqlx::query("SELECT name, abbreviation FROM item_type WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(ItemTypeRecord {
                name: get(r, "name")?,
                abbreviation: get(r, "abbreviation")?,
            })),
            None => Ok(None),
        }
    }

    async fn item_group(&self, name: &str) -> Result<Option<ItemGroup>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, parent, abbreviation, lft, rgt FROM item_group WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(ItemGroup {
                name: get(r, "name")?,
                parent: get(r, "parent")?,
                abbreviation: get(r, "abbreviation")?,
                lft: get(r, "lft")?,
                rgt: get(r, "rgt")?,
            })),
            None => Ok(None),
        }
    }

    async fn group_default_warehouse(
        &self,
        item_group: &str,
        company: Option<&str>,
    ) -> Option<String> {
        for table in GROUP_DEFAULT_TABLES {
            match self.default_from_table(table, item_group, company).await {
                Ok(Some(warehouse)) => return Some(warehouse),
                Ok(None) => {}
                Err(error) => {
                    debug!(
                        event_name = "db.group_default.lookup_failed",
                        table,
                        item_group,
                        error = %error,
                        "group default lookup failed; treating as not found"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::SqlMasterDataRepository;
    use crate::repositories::MasterDataRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, SqlMasterDataRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        exec(
            &pool,
            "INSERT INTO item_group (name, parent, abbreviation, lft, rgt)
             VALUES ('Panels', NULL, 'PNL', 2, 5)",
        )
        .await;
        (pool.clone(), SqlMasterDataRepository::new(pool))
    }

    async fn exec(pool: &DbPool, sql: &str) {
        sqlx::query(sql).execute(pool).await.expect("fixture statement");
    }

    #[tokio::test]
    async fn masters_load_by_name() {
        let (pool, repo) = setup().await;
        exec(&pool, "INSERT INTO brand (name, abbreviation) VALUES ('Acme', 'ACME')").await;
        exec(&pool, "INSERT INTO item_type (name, abbreviation) VALUES ('Customized Product', 'CUS')")
            .await;

        let brand = repo.brand("Acme").await.expect("load").expect("brand exists");
        assert_eq!(brand.abbreviation.as_deref(), Some("ACME"));
        let record = repo.item_type("Customized Product").await.expect("load").expect("type");
        assert_eq!(record.abbreviation.as_deref(), Some("CUS"));
        let panels = repo.item_group("Panels").await.expect("load").expect("group exists");
        assert_eq!((panels.lft, panels.rgt), (2, 5));
        assert!(repo.item_type("Part").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn default_warehouse_prefers_company_then_any_row() {
        let (pool, repo) = setup().await;
        exec(
            &pool,
            "INSERT INTO item_group_defaults (item_group, company, default_warehouse) VALUES
                ('Panels', 'Other Co', 'Stores - OC'),
                ('Panels', 'Connect', 'Stores - CN')",
        )
        .await;

        assert_eq!(
            repo.group_default_warehouse("Panels", Some("Connect")).await.as_deref(),
            Some("Stores - CN")
        );
        assert_eq!(
            repo.group_default_warehouse("Panels", Some("Unknown Co")).await.as_deref(),
            Some("Stores - OC"),
            "falls back to any row of the group"
        );
        assert_eq!(repo.group_default_warehouse("Frames", None).await, None);
    }

    #[tokio::test]
    async fn legacy_table_is_consulted_and_faults_are_swallowed() {
        let (pool, repo) = setup().await;
        exec(
            &pool,
            "INSERT INTO item_group_default (item_group, company, default_warehouse)
             VALUES ('Frames', NULL, 'Legacy Stores')",
        )
        .await;

        assert_eq!(
            repo.group_default_warehouse("Frames", Some("Connect")).await.as_deref(),
            Some("Legacy Stores")
        );

        exec(&pool, "DROP TABLE item_group_defaults").await;
        assert_eq!(
            repo.group_default_warehouse("Frames", None).await.as_deref(),
            Some("Legacy Stores"),
            "a failing current table falls through to the legacy one"
        );
    }
}

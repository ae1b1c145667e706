use chrono::Utc;

use tally_core::domain::item::{Item, ItemCode, ItemFlags, MeasurementType, UomConversion};

use super::{get, rows_from_json, rows_to_json, ItemRepository, RepositoryError};
use crate::DbPool;

pub struct SqlItemRepository {
    pool: DbPool,
}

impl SqlItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_measurement_type(value: Option<String>) -> Option<MeasurementType> {
    value.as_deref().and_then(MeasurementType::parse)
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<Item, RepositoryError> {
    let code: String = get(row, "code")?;
    let uoms_json: String = get(row, "uoms_json")?;
    let uoms: Vec<UomConversion> = rows_from_json("uoms_json", &uoms_json)?;

    Ok(Item {
        code: Some(ItemCode(code)),
        item_name: get(row, "item_name")?,
        item_type: get(row, "item_type")?,
        item_group: get(row, "item_group")?,
        brand: get(row, "brand")?,
        main_product: get(row, "main_product")?,
        part_type: get(row, "part_type")?,
        stock_uom: get(row, "stock_uom")?,
        flags: ItemFlags {
            is_purchase_item: get::<i64>(row, "is_purchase_item")? != 0,
            is_sales_item: get::<i64>(row, "is_sales_item")? != 0,
            is_stock_item: get::<i64>(row, "is_stock_item")? != 0,
            is_fixed_asset: get::<i64>(row, "is_fixed_asset")? != 0,
        },
        valuation_rate: get(row, "valuation_rate")?,
        width: get(row, "width")?,
        height: get(row, "height")?,
        depth: get(row, "depth")?,
        measurement_type: parse_measurement_type(get(row, "measurement_type")?),
        uoms,
        measurement_total: get(row, "measurement_total")?,
        measurement_total_stock_uom: get(row, "measurement_total_stock_uom")?,
    })
}

#[async_trait::async_trait]
impl ItemRepository for SqlItemRepository {
    async fn find_by_code(&self, code: &ItemCode) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query(
            "SELECT code, item_name, item_type, item_group, brand, main_product, part_type,
                    stock_uom, is_purchase_item, is_sales_item, is_stock_item, is_fixed_asset,
                    valuation_rate, width, height, depth, measurement_type, uoms_json,
                    measurement_total, measurement_total_stock_uom
             FROM item WHERE code = ?",
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_item(r)?)),
            None => Ok(None),
        }
    }

    async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM item WHERE code = ?)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists == 1)
    }

    async fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        let codes: Vec<String> =
            sqlx::query_scalar("SELECT code FROM item WHERE substr(code, 1, length(?1)) = ?1")
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?;
        Ok(codes)
    }

    async fn insert(&self, item: &Item) -> Result<(), RepositoryError> {
        let code = item.code.as_ref().ok_or(RepositoryError::Unnamed("Item"))?;
        let uoms_json = rows_to_json("uoms_json", &item.uoms)?;

        sqlx::query(
            "INSERT INTO item (code, item_name, item_type, item_group, brand, main_product,
                               part_type, stock_uom, is_purchase_item, is_sales_item,
                               is_stock_item, is_fixed_asset, valuation_rate, width, height,
                               depth, measurement_type, uoms_json, measurement_total,
                               measurement_total_stock_uom, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&code.0)
        .bind(&item.item_name)
        .bind(&item.item_type)
        .bind(&item.item_group)
        .bind(&item.brand)
        .bind(&item.main_product)
        .bind(&item.part_type)
        .bind(&item.stock_uom)
        .bind(item.flags.is_purchase_item)
        .bind(item.flags.is_sales_item)
        .bind(item.flags.is_stock_item)
        .bind(item.flags.is_fixed_asset)
        .bind(item.valuation_rate)
        .bind(item.width)
        .bind(item.height)
        .bind(item.depth)
        .bind(item.measurement_type.map(MeasurementType::as_str))
        .bind(uoms_json)
        .bind(item.measurement_total)
        .bind(item.measurement_total_stock_uom)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tally_core::domain::item::{Item, ItemCode, MeasurementType};

    use super::SqlItemRepository;
    use crate::repositories::{ItemRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlItemRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlItemRepository::new(pool)
    }

    fn panel() -> Item {
        let mut item: Item = serde_json::from_value(serde_json::json!({
            "code": "ACME-PNL-001",
            "item_name": "Acoustic panel",
            "item_type": "Standard Product",
            "item_group": "Panels",
            "brand": "Acme",
            "width": 1.2,
            "height": 0.6,
            "measurement_type": "Width Only",
            "uoms": [{ "uom": "Nos", "conversion_factor": 1 }]
        }))
        .expect("item");
        item.validate();
        item
    }

    #[tokio::test]
    async fn insert_then_load_round_trips_flags_and_measurements() {
        let repo = setup().await;
        repo.insert(&panel()).await.expect("insert");

        let loaded = repo
            .find_by_code(&ItemCode("ACME-PNL-001".to_string()))
            .await
            .expect("load")
            .expect("item exists");

        assert_eq!(loaded, panel());
        assert!(loaded.flags.is_sales_item && loaded.flags.is_stock_item);
        assert_eq!(loaded.measurement_type, Some(MeasurementType::WidthOnly));
        assert!(repo.code_exists("ACME-PNL-001").await.expect("exists"));
        assert!(!repo.code_exists("ACME-PNL-002").await.expect("exists"));
    }

    #[tokio::test]
    async fn duplicate_codes_are_rejected_by_the_store() {
        let repo = setup().await;
        repo.insert(&panel()).await.expect("insert");

        let error = repo.insert(&panel()).await.expect_err("duplicate");
        assert!(matches!(error, RepositoryError::Database(_)));
    }

    #[tokio::test]
    async fn prefix_lookup_matches_base_and_suffixed_codes() {
        let repo = setup().await;
        for code in ["PRT-FRAME-LEG", "PRT-FRAME-LEG-001", "PRT-FRAME-ARM"] {
            let mut item = panel();
            item.code = Some(ItemCode(code.to_string()));
            repo.insert(&item).await.expect("insert");
        }

        let mut codes = repo.codes_with_prefix("PRT-FRAME-LEG").await.expect("lookup");
        codes.sort();
        assert_eq!(codes, vec!["PRT-FRAME-LEG".to_string(), "PRT-FRAME-LEG-001".to_string()]);
        assert!(repo.codes_with_prefix("WIP-").await.expect("lookup").is_empty());
    }

    #[tokio::test]
    async fn unnamed_items_cannot_be_inserted() {
        let repo = setup().await;
        let mut item = panel();
        item.code = None;

        let error = repo.insert(&item).await.expect_err("unnamed");
        assert!(matches!(error, RepositoryError::Unnamed("Item")));
    }
}

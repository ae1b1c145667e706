use tracing::debug;

use tally_core::domain::item::ItemCode;

use super::{PriceSourceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPriceSourceRepository {
    pool: DbPool,
}

impl SqlPriceSourceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn item_valuation_rate(&self, item: &ItemCode) -> Result<Option<f64>, RepositoryError> {
        let rate: Option<f64> =
            sqlx::query_scalar("SELECT valuation_rate FROM item WHERE code = ?")
                .bind(&item.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(rate)
    }

    async fn bin_valuation_rate(
        &self,
        item: &ItemCode,
        warehouse: Option<&str>,
    ) -> Result<Option<f64>, RepositoryError> {
        let rate: Option<f64> = sqlx::query_scalar(
            "SELECT valuation_rate FROM bin
             WHERE item_code = ?1 AND (?2 IS NULL OR warehouse = ?2)
             ORDER BY modified DESC LIMIT 1",
        )
        .bind(&item.0)
        .bind(warehouse)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rate)
    }

    async fn ledger_valuation_rate(
        &self,
        item: &ItemCode,
        warehouse: Option<&str>,
    ) -> Result<Option<f64>, RepositoryError> {
        let rate: Option<f64> = sqlx::query_scalar(
            "SELECT valuation_rate FROM stock_ledger_entry
             WHERE item_code = ?1 AND (?2 IS NULL OR warehouse = ?2)
             ORDER BY posting_date DESC, posting_time DESC, creation DESC LIMIT 1",
        )
        .bind(&item.0)
        .bind(warehouse)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rate)
    }
}

/// Keeps a looked-up rate only when it is set and non-zero.
fn nonzero(rate: Option<f64>) -> Option<f64> {
    rate.filter(|value| *value != 0.0)
}

fn usable(
    source: &str,
    item: &ItemCode,
    result: Result<Option<f64>, RepositoryError>,
) -> Option<f64> {
    match result {
        Ok(rate) => nonzero(rate),
        Err(error) => {
            debug!(
                event_name = "db.valuation_rate.lookup_failed",
                source,
                item = %item.0,
                error = %error,
                "valuation lookup failed; trying next source"
            );
            None
        }
    }
}

#[async_trait::async_trait]
impl PriceSourceRepository for SqlPriceSourceRepository {
    async fn latest_buying_price(
        &self,
        item: &ItemCode,
        price_list: &str,
    ) -> Result<f64, RepositoryError> {
        let rate: Option<f64> = sqlx::query_scalar(
            "SELECT price_list_rate FROM item_price
             WHERE item_code = ? AND price_list = ? AND buying = 1
             ORDER BY valid_from DESC, modified DESC LIMIT 1",
        )
        .bind(&item.0)
        .bind(price_list)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rate.unwrap_or(0.0))
    }

    async fn valuation_rate(&self, item: &ItemCode, warehouse: Option<&str>) -> f64 {
        if let Some(rate) = usable("item", item, self.item_valuation_rate(item).await) {
            return rate;
        }
        if let Some(rate) = usable("bin", item, self.bin_valuation_rate(item, warehouse).await) {
            return rate;
        }
        let ledger = self.ledger_valuation_rate(item, warehouse).await;
        usable("stock_ledger_entry", item, ledger).unwrap_or(0.0)
    }

    async fn last_purchase_rate(&self, item: &ItemCode) -> Result<f64, RepositoryError> {
        for table in ["purchase_invoice_item", "purchase_receipt_item"] {
            let rate: Option<f64> = sqlx::query_scalar(&format!(
                "SELECT rate FROM {table} WHERE item_code = ? ORDER BY creation DESC LIMIT 1"
            ))
            .bind(&item.0)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(rate) = nonzero(rate) {
                return Ok(rate);
            }
        }
        Ok(0.0)
    }
}

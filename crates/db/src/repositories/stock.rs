use chrono::{NaiveDate, NaiveTime, Utc};

use tally_core::domain::stock::{PickList, StockEntry, WorkOrder};

use super::{get, rows_from_json, rows_to_json, RepositoryError, StockRepository};
use crate::DbPool;

pub struct SqlStockRepository {
    pool: DbPool,
}

impl SqlStockRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_pick_list(row: &sqlx::sqlite::SqliteRow) -> Result<PickList, RepositoryError> {
    let locations_json: String = get(row, "locations_json")?;
    Ok(PickList {
        name: get(row, "name")?,
        company: get(row, "company")?,
        work_order: get(row, "work_order")?,
        posting_date: get(row, "posting_date")?,
        posting_time: get(row, "posting_time")?,
        locations: rows_from_json("locations_json", &locations_json)?,
    })
}

fn row_to_stock_entry(row: &sqlx::sqlite::SqliteRow) -> Result<StockEntry, RepositoryError> {
    let items_json: String = get(row, "items_json")?;
    let posting_date: NaiveDate = get(row, "posting_date")?;
    let posting_time: NaiveTime = get(row, "posting_time")?;
    Ok(StockEntry {
        name: get(row, "name")?,
        stock_entry_type: get(row, "stock_entry_type")?,
        company: get(row, "company")?,
        posting_date,
        posting_time,
        from_bom: get::<i64>(row, "from_bom")? != 0,
        work_order: get(row, "work_order")?,
        fg_completed_qty: get(row, "fg_completed_qty")?,
        pick_list: get(row, "pick_list")?,
        remarks: get(row, "remarks")?,
        items: rows_from_json("items_json", &items_json)?,
    })
}

#[async_trait::async_trait]
impl StockRepository for SqlStockRepository {
    async fn find_pick_list(&self, name: &str) -> Result<Option<PickList>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, company, work_order, posting_date, posting_time, locations_json
             FROM pick_list WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_pick_list(r)?)),
            None => Ok(None),
        }
    }

    async fn find_work_order(&self, name: &str) -> Result<Option<WorkOrder>, RepositoryError> {
        let row = sqlx::query("SELECT name, company, wip_warehouse FROM work_order WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(WorkOrder {
                name: get(r, "name")?,
                company: get(r, "company")?,
                wip_warehouse: get(r, "wip_warehouse")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_stock_entry(&self, entry: &StockEntry) -> Result<(), RepositoryError> {
        let name = entry.name.as_deref().ok_or(RepositoryError::Unnamed("Stock Entry"))?;

        sqlx::query(
            "INSERT INTO stock_entry (name, stock_entry_type, company, posting_date, posting_time,
                                      from_bom, work_order, fg_completed_qty, pick_list, remarks,
                                      items_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(&entry.stock_entry_type)
        .bind(&entry.company)
        .bind(entry.posting_date)
        .bind(entry.posting_time)
        .bind(entry.from_bom)
        .bind(&entry.work_order)
        .bind(entry.fg_completed_qty)
        .bind(&entry.pick_list)
        .bind(&entry.remarks)
        .bind(rows_to_json("items_json", &entry.items)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_stock_entry(&self, name: &str) -> Result<Option<StockEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, stock_entry_type, company, posting_date, posting_time, from_bom,
                    work_order, fg_completed_qty, pick_list, remarks, items_json
             FROM stock_entry WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_stock_entry(r)?)),
            None => Ok(None),
        }
    }
}

use async_trait::async_trait;
use thiserror::Error;

use tally_core::domain::boq::{Boq, BoqId};
use tally_core::domain::costing_note::{CostingNote, CostingNoteId};
use tally_core::domain::item::{Brand, Item, ItemCode, ItemGroup, ItemTypeRecord};
use tally_core::domain::opportunity::{Opportunity, OpportunityId};
use tally_core::domain::stock::{PickList, StockEntry, WorkOrder};
use tally_core::domain::RowId;

pub mod boq;
pub mod costing_note;
pub mod item;
pub mod masters;
pub mod naming_series;
pub mod opportunity;
pub mod prices;
pub mod stock;

pub use boq::SqlBoqRepository;
pub use costing_note::SqlCostingNoteRepository;
pub use item::SqlItemRepository;
pub use masters::SqlMasterDataRepository;
pub use naming_series::SqlNamingSeriesRepository;
pub use opportunity::SqlOpportunityRepository;
pub use prices::SqlPriceSourceRepository;
pub use stock::SqlStockRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("cannot persist a {0} that has no name")]
    Unnamed(&'static str),
}

impl RepositoryError {
    pub(crate) fn decode(column: &str, error: impl std::fmt::Display) -> Self {
        Self::Decode(format!("{column}: {error}"))
    }
}

/// Child tables are stored as JSON snapshots on their parent row.
pub(crate) fn rows_to_json<T: serde::Serialize>(
    column: &str,
    rows: &T,
) -> Result<String, RepositoryError> {
    serde_json::to_string(rows).map_err(|e| RepositoryError::decode(column, e))
}

pub(crate) fn rows_from_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::decode(column, e))
}

pub(crate) fn get<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    use sqlx::Row;
    row.try_get(column).map_err(|e| RepositoryError::decode(column, e))
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_code(&self, code: &ItemCode) -> Result<Option<Item>, RepositoryError>;
    async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError>;
    /// Codes equal to `prefix` or starting with it.
    async fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>, RepositoryError>;
    /// Inserts a new item; the item's code must already be resolved.
    async fn insert(&self, item: &Item) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MasterDataRepository: Send + Sync {
    async fn brand(&self, name: &str) -> Result<Option<Brand>, RepositoryError>;
    async fn item_type(&self, name: &str) -> Result<Option<ItemTypeRecord>, RepositoryError>;
    async fn item_group(&self, name: &str) -> Result<Option<ItemGroup>, RepositoryError>;

    /// Default warehouse of an item group for a company, else any default row of the
    /// group. Lookup faults read as "not found".
    async fn group_default_warehouse(&self, item_group: &str, company: Option<&str>)
        -> Option<String>;
}

#[async_trait]
pub trait NamingSeriesRepository: Send + Sync {
    /// Increments and returns the counter kept under `prefix`, starting at 1.
    async fn next_value(&self, prefix: &str) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait BoqRepository: Send + Sync {
    async fn find_by_name(&self, name: &BoqId) -> Result<Option<Boq>, RepositoryError>;
    /// BOQ created from a given Costing Note row, if one exists.
    async fn find_by_source(
        &self,
        costing_note: &CostingNoteId,
        line_id: &RowId,
    ) -> Result<Option<BoqId>, RepositoryError>;
    async fn save(&self, boq: &Boq) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CostingNoteRepository: Send + Sync {
    async fn find_by_name(&self, name: &CostingNoteId)
        -> Result<Option<CostingNote>, RepositoryError>;
    async fn save(&self, note: &CostingNote) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn find_by_name(&self, name: &OpportunityId)
        -> Result<Option<Opportunity>, RepositoryError>;
    async fn save(&self, opportunity: &Opportunity) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn find_pick_list(&self, name: &str) -> Result<Option<PickList>, RepositoryError>;
    async fn find_work_order(&self, name: &str) -> Result<Option<WorkOrder>, RepositoryError>;
    async fn insert_stock_entry(&self, entry: &StockEntry) -> Result<(), RepositoryError>;
    async fn find_stock_entry(&self, name: &str) -> Result<Option<StockEntry>, RepositoryError>;
}

/// Read-only unit cost sources used by "update BOQ costs". Every method answers 0
/// when nothing is found.
#[async_trait]
pub trait PriceSourceRepository: Send + Sync {
    async fn latest_buying_price(
        &self,
        item: &ItemCode,
        price_list: &str,
    ) -> Result<f64, RepositoryError>;

    /// Item valuation rate, then latest bin, then latest stock ledger entry. Faults at
    /// each step fall through to the next.
    async fn valuation_rate(&self, item: &ItemCode, warehouse: Option<&str>) -> f64;

    async fn last_purchase_rate(&self, item: &ItemCode) -> Result<f64, RepositoryError>;
}

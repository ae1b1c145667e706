//! Document hooks and callable operations, orchestrated over the repositories.
//!
//! Every operation runs in a single request scope: load what the pure rules in
//! `tally-core` need, apply them, persist the result.

mod boq;
mod items;
mod selling;
mod stock;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tally_core::config::ErpConfig;
use tally_core::errors::ApplicationError;
use tally_core::naming::SeriesPattern;
use tally_core::propagation::PropagationOutcome;
use tally_db::repositories::{
    BoqRepository, CostingNoteRepository, ItemRepository, MasterDataRepository,
    NamingSeriesRepository, OpportunityRepository, PriceSourceRepository, SqlBoqRepository,
    SqlCostingNoteRepository, SqlItemRepository, SqlMasterDataRepository,
    SqlNamingSeriesRepository, SqlOpportunityRepository, SqlPriceSourceRepository,
    SqlStockRepository, StockRepository,
};
use tally_db::{DbPool, RepositoryError};

pub use boq::{BoqLink, UpdateCostsReport, UpdateCostsRequest};

pub const BOQ_SERIES: &str = "BOQ-.YYYY.-";
pub const COSTING_NOTE_SERIES: &str = "CN-.YYYY.-";
pub const OPPORTUNITY_SERIES: &str = "OPP-.YYYY.-";
pub const STOCK_ENTRY_SERIES: &str = "STE-.YYYY.-";

pub type ServiceResult<T> = Result<T, ApplicationError>;

/// A submitted document together with what its submit pushed downstream.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitReport<T> {
    pub document: T,
    pub propagation: PropagationOutcome,
}

pub struct DocumentServices {
    items: Arc<dyn ItemRepository>,
    masters: Arc<dyn MasterDataRepository>,
    series: Arc<dyn NamingSeriesRepository>,
    opportunities: Arc<dyn OpportunityRepository>,
    costing_notes: Arc<dyn CostingNoteRepository>,
    boqs: Arc<dyn BoqRepository>,
    stock: Arc<dyn StockRepository>,
    prices: Arc<dyn PriceSourceRepository>,
    erp: ErpConfig,
}

impl DocumentServices {
    pub fn from_pool(pool: DbPool, erp: ErpConfig) -> Self {
        Self {
            items: Arc::new(SqlItemRepository::new(pool.clone())),
            masters: Arc::new(SqlMasterDataRepository::new(pool.clone())),
            series: Arc::new(SqlNamingSeriesRepository::new(pool.clone())),
            opportunities: Arc::new(SqlOpportunityRepository::new(pool.clone())),
            costing_notes: Arc::new(SqlCostingNoteRepository::new(pool.clone())),
            boqs: Arc::new(SqlBoqRepository::new(pool.clone())),
            stock: Arc::new(SqlStockRepository::new(pool.clone())),
            prices: Arc::new(SqlPriceSourceRepository::new(pool)),
            erp,
        }
    }

    /// Next name of an autoname pattern such as `BOQ-.YYYY.-`.
    async fn allocate_name(&self, pattern: &str) -> ServiceResult<String> {
        let series = SeriesPattern::parse(pattern)?;
        let prefix = series.prefix(today());
        let counter = self.series.next_value(&prefix).await.map_err(persistence)?;
        Ok(series.format(&prefix, counter))
    }

    fn company_or_default(&self, company: Option<&str>) -> Option<String> {
        non_blank(company).map(str::to_string).or_else(|| self.erp.default_company.clone())
    }
}

pub(crate) fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
pub(crate) mod test_support {
    use tally_core::config::{AppConfig, ErpConfig};
    use tally_db::{connect_with_settings, migrations, DbPool, SeedDataset};

    use super::DocumentServices;

    pub fn erp() -> ErpConfig {
        let mut erp = AppConfig::default().erp;
        erp.default_company = Some("Connect Manufacturing".to_string());
        erp
    }

    pub async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed");
        pool
    }

    pub async fn seeded() -> DocumentServices {
        DocumentServices::from_pool(seeded_pool().await, erp())
    }
}

use tally_core::domain::item::ItemCode;
use tally_db::repositories::{
    MasterDataRepository, NamingSeriesRepository, PriceSourceRepository, SqlMasterDataRepository,
    SqlNamingSeriesRepository, SqlPriceSourceRepository,
};
use tally_db::{connect_with_settings, migrations, DbPool, SeedDataset};

type TestResult<T = ()> = Result<T, String>;

async fn seeded_pool() -> TestResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect failed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrations failed: {error}"))?;
    SeedDataset::load(&pool).await.map_err(|error| format!("seed failed: {error}"))?;
    Ok(pool)
}

fn code(value: &str) -> ItemCode {
    ItemCode(value.to_string())
}

#[tokio::test]
async fn seeded_items_answer_each_cost_source() -> TestResult {
    let pool = seeded_pool().await?;
    let prices = SqlPriceSourceRepository::new(pool);

    let listed = prices
        .latest_buying_price(&code("MTR-PNL-001"), "Standard Buying")
        .await
        .map_err(|error| error.to_string())?;
    if listed != 20.0 {
        return Err(format!("expected price list rate 20, got {listed}"));
    }

    let from_item = prices.valuation_rate(&code("MTR-PNL-001"), None).await;
    let from_bin = prices.valuation_rate(&code("MTR-FRM-001"), Some("Yard - CM")).await;
    if (from_item, from_bin) != (18.5, 33.25) {
        return Err(format!("unexpected valuation rates {from_item} / {from_bin}"));
    }

    let purchased =
        prices.last_purchase_rate(&code("MTR-PNL-001")).await.map_err(|error| error.to_string())?;
    if purchased != 19.0 {
        return Err(format!("expected last purchase rate 19, got {purchased}"));
    }
    Ok(())
}

#[tokio::test]
async fn seeded_series_continue_after_existing_codes() -> TestResult {
    let pool = seeded_pool().await?;
    let series = SqlNamingSeriesRepository::new(pool.clone());

    let next = series.next_value("ACME-PNL-").await.map_err(|error| error.to_string())?;
    if next != 2 {
        return Err(format!("expected the seeded series to continue at 2, got {next}"));
    }

    let masters = SqlMasterDataRepository::new(pool);
    let warehouse = masters.group_default_warehouse("Frames", Some("Connect Manufacturing")).await;
    if warehouse.as_deref() != Some("Yard - CM") {
        return Err(format!("expected company-less default to apply, got {warehouse:?}"));
    }
    Ok(())
}

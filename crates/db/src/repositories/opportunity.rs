use chrono::Utc;

use tally_core::domain::opportunity::{Opportunity, OpportunityId};
use tally_core::lifecycle::DocStatus;

use super::{get, rows_from_json, rows_to_json, OpportunityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOpportunityRepository {
    pool: DbPool,
}

impl SqlOpportunityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_opportunity(row: &sqlx::sqlite::SqliteRow) -> Result<Opportunity, RepositoryError> {
    let name: String = get(row, "name")?;
    let status: String = get(row, "status")?;
    let items_json: String = get(row, "items_json")?;
    let standard_items_json: String = get(row, "standard_items_json")?;

    Ok(Opportunity {
        name: Some(OpportunityId(name)),
        status: DocStatus::parse(&status),
        opportunity_from: get(row, "opportunity_from")?,
        party_name: get(row, "party_name")?,
        company: get(row, "company")?,
        items: rows_from_json("items_json", &items_json)?,
        standard_items: rows_from_json("standard_items_json", &standard_items_json)?,
    })
}

#[async_trait::async_trait]
impl OpportunityRepository for SqlOpportunityRepository {
    async fn find_by_name(
        &self,
        name: &OpportunityId,
    ) -> Result<Option<Opportunity>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, status, opportunity_from, party_name, company, items_json,
                    standard_items_json
             FROM opportunity WHERE name = ?",
        )
        .bind(&name.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_opportunity(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, opportunity: &Opportunity) -> Result<(), RepositoryError> {
        let name = opportunity.name.as_ref().ok_or(RepositoryError::Unnamed("Opportunity"))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO opportunity (name, status, opportunity_from, party_name, company,
                                      items_json, standard_items_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 status = excluded.status,
                 opportunity_from = excluded.opportunity_from,
                 party_name = excluded.party_name,
                 company = excluded.company,
                 items_json = excluded.items_json,
                 standard_items_json = excluded.standard_items_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&name.0)
        .bind(opportunity.status.as_str())
        .bind(&opportunity.opportunity_from)
        .bind(&opportunity.party_name)
        .bind(&opportunity.company)
        .bind(rows_to_json("items_json", &opportunity.items)?)
        .bind(rows_to_json("standard_items_json", &opportunity.standard_items)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tally_core::domain::opportunity::{Opportunity, OpportunityId};

    use super::SqlOpportunityRepository;
    use crate::repositories::OpportunityRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn opportunity_keeps_blank_rates_distinct_from_zero() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlOpportunityRepository::new(pool);

        let opportunity: Opportunity = serde_json::from_value(serde_json::json!({
            "name": "OPP-2026-00001",
            "opportunity_from": "Customer",
            "party_name": "Northwind Fitouts",
            "items": [
                { "item_code": "ACME-PNL-001", "qty": 4 },
                { "item_code": "SRV-001", "qty": 1, "rate": 0 }
            ],
            "standard_items": [{ "item": "ACS-0001", "qty": 10, "rate": 2.5 }]
        }))
        .expect("opportunity");
        repo.save(&opportunity).await.expect("save");

        let loaded = repo
            .find_by_name(&OpportunityId("OPP-2026-00001".to_string()))
            .await
            .expect("load")
            .expect("opportunity exists");

        assert_eq!(loaded, opportunity);
        assert_eq!(loaded.items[0].rate, None);
        assert_eq!(loaded.items[1].rate, Some(0.0));
        assert!(repo
            .find_by_name(&OpportunityId("OPP-2026-00099".to_string()))
            .await
            .expect("load")
            .is_none());
    }
}

use chrono::Utc;

use tally_core::domain::costing_note::{CostingNote, CostingNoteId, CostingNoteTotals};
use tally_core::domain::opportunity::OpportunityId;
use tally_core::lifecycle::DocStatus;

use super::{get, rows_from_json, rows_to_json, CostingNoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCostingNoteRepository {
    pool: DbPool,
}

impl SqlCostingNoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_note(row: &sqlx::sqlite::SqliteRow) -> Result<CostingNote, RepositoryError> {
    let name: String = get(row, "name")?;
    let status: String = get(row, "status")?;
    let opportunity: Option<String> = get(row, "opportunity")?;
    let items_json: String = get(row, "items_json")?;

    Ok(CostingNote {
        name: Some(CostingNoteId(name)),
        status: DocStatus::parse(&status),
        opportunity: opportunity.map(OpportunityId),
        party_type: get(row, "party_type")?,
        party_name: get(row, "party_name")?,
        default_profit_margin: get(row, "default_profit_margin")?,
        legacy_profit_margin: get(row, "legacy_profit_margin")?,
        items: rows_from_json("items_json", &items_json)?,
        totals: CostingNoteTotals {
            total_cost: get(row, "total_cost")?,
            total_target_selling_price: get(row, "total_target_selling_price")?,
            total_profit: get(row, "total_profit")?,
            profit_margin: get(row, "profit_margin")?,
        },
    })
}

#[async_trait::async_trait]
impl CostingNoteRepository for SqlCostingNoteRepository {
    async fn find_by_name(
        &self,
        name: &CostingNoteId,
    ) -> Result<Option<CostingNote>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, status, opportunity, party_type, party_name, default_profit_margin,
                    legacy_profit_margin, total_cost, total_target_selling_price, total_profit,
                    profit_margin, items_json
             FROM costing_note WHERE name = ?",
        )
        .bind(&name.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_note(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, note: &CostingNote) -> Result<(), RepositoryError> {
        let name = note.name.as_ref().ok_or(RepositoryError::Unnamed("Costing Note"))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO costing_note (name, status, opportunity, party_type, party_name,
                                       default_profit_margin, legacy_profit_margin, total_cost,
                                       total_target_selling_price, total_profit, profit_margin,
                                       items_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 status = excluded.status,
                 opportunity = excluded.opportunity,
                 party_type = excluded.party_type,
                 party_name = excluded.party_name,
                 default_profit_margin = excluded.default_profit_margin,
                 legacy_profit_margin = excluded.legacy_profit_margin,
                 total_cost = excluded.total_cost,
                 total_target_selling_price = excluded.total_target_selling_price,
                 total_profit = excluded.total_profit,
                 profit_margin = excluded.profit_margin,
                 items_json = excluded.items_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&name.0)
        .bind(note.status.as_str())
        .bind(note.opportunity.as_ref().map(|id| id.0.as_str()))
        .bind(&note.party_type)
        .bind(&note.party_name)
        .bind(note.default_profit_margin)
        .bind(note.legacy_profit_margin)
        .bind(note.totals.total_cost)
        .bind(note.totals.total_target_selling_price)
        .bind(note.totals.total_profit)
        .bind(note.totals.profit_margin)
        .bind(rows_to_json("items_json", &note.items)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tally_core::costing::validate_costing_note;
    use tally_core::domain::costing_note::{CostingNote, CostingNoteId};
    use tally_core::lifecycle::DocStatus;

    use super::SqlCostingNoteRepository;
    use crate::repositories::CostingNoteRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn costing_note_round_trips_rows_and_blank_margins() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlCostingNoteRepository::new(pool);

        let mut note: CostingNote = serde_json::from_value(serde_json::json!({
            "name": "CN-2026-00001",
            "opportunity": "OPP-2026-00001",
            "party_type": "Customer",
            "party_name": "Northwind Fitouts",
            "default_profit_margin": "",
            "legacy_profit_margin": 15,
            "items": [
                { "item": "ACME-PNL-001", "qty": 2, "cost": 100 },
                { "item": "SRV-001", "qty": 1, "cost": 0, "default_profit_margin": 40 }
            ]
        }))
        .expect("note");
        validate_costing_note(&mut note);
        repo.save(&note).await.expect("save");

        let mut loaded = repo
            .find_by_name(&CostingNoteId("CN-2026-00001".to_string()))
            .await
            .expect("load")
            .expect("note exists");
        assert_eq!(loaded, note);
        assert_eq!(loaded.default_profit_margin, None);
        assert_eq!(loaded.items[0].target_selling_price, 115.0);
        assert_eq!(loaded.items[1].target_selling_price, 0.0);

        loaded.status = DocStatus::Submitted;
        repo.save(&loaded).await.expect("resave");
        let reloaded = repo
            .find_by_name(&CostingNoteId("CN-2026-00001".to_string()))
            .await
            .expect("load")
            .expect("note exists");
        assert_eq!(reloaded.status, DocStatus::Submitted);
    }
}

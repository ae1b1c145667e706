use chrono::{NaiveDate, Utc};

use tally_core::domain::boq::{Boq, BoqId, BoqTotals};
use tally_core::domain::costing_note::CostingNoteId;
use tally_core::domain::item::ItemCode;
use tally_core::domain::RowId;
use tally_core::lifecycle::DocStatus;

use super::{get, rows_from_json, rows_to_json, BoqRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBoqRepository {
    pool: DbPool,
}

impl SqlBoqRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_boq(row: &sqlx::sqlite::SqliteRow) -> Result<Boq, RepositoryError> {
    let name: String = get(row, "name")?;
    let status: String = get(row, "status")?;
    let costing_note: Option<String> = get(row, "costing_note")?;
    let line_id: Option<String> = get(row, "line_id")?;
    let item: Option<String> = get(row, "item")?;
    let start_date: Option<NaiveDate> = get(row, "start_date")?;
    let material_costs: String = get(row, "material_costs_json")?;
    let labor_costs: String = get(row, "labor_costs_json")?;
    let expenses: String = get(row, "expenses_json")?;
    let contractors: String = get(row, "contractors_json")?;

    Ok(Boq {
        name: Some(BoqId(name)),
        status: DocStatus::parse(&status),
        costing_note: costing_note.map(CostingNoteId),
        line_id: line_id.map(RowId),
        item: item.map(ItemCode),
        unit: get(row, "unit")?,
        project_qty: get(row, "project_qty")?,
        start_date,
        base_margin: get(row, "base_margin")?,
        s_margin: get(row, "s_margin")?,
        material_costs: rows_from_json("material_costs_json", &material_costs)?,
        labor_costs: rows_from_json("labor_costs_json", &labor_costs)?,
        expenses: rows_from_json("expenses_json", &expenses)?,
        contractors: rows_from_json("contractors_json", &contractors)?,
        totals: BoqTotals {
            total_material_costs: get(row, "total_material_costs")?,
            total_labor_costs: get(row, "total_labor_costs")?,
            total_expenses: get(row, "total_expenses")?,
            total_contractors: get(row, "total_contractors")?,
            total_cost: get(row, "total_cost")?,
        },
    })
}

#[async_trait::async_trait]
impl BoqRepository for SqlBoqRepository {
    async fn find_by_name(&self, name: &BoqId) -> Result<Option<Boq>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, status, costing_note, line_id, item, unit, project_qty, start_date,
                    base_margin, s_margin, total_material_costs, total_labor_costs,
                    total_expenses, total_contractors, total_cost, material_costs_json,
                    labor_costs_json, expenses_json, contractors_json
             FROM boq WHERE name = ?",
        )
        .bind(&name.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_boq(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_source(
        &self,
        costing_note: &CostingNoteId,
        line_id: &RowId,
    ) -> Result<Option<BoqId>, RepositoryError> {
        let name: Option<String> = sqlx::query_scalar(
            "SELECT name FROM boq WHERE costing_note = ? AND line_id = ?
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(&costing_note.0)
        .bind(&line_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name.map(BoqId))
    }

    async fn save(&self, boq: &Boq) -> Result<(), RepositoryError> {
        let name = boq.name.as_ref().ok_or(RepositoryError::Unnamed("BOQ"))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO boq (name, status, costing_note, line_id, item, unit, project_qty,
                              start_date, base_margin, s_margin, total_material_costs,
                              total_labor_costs, total_expenses, total_contractors, total_cost,
                              material_costs_json, labor_costs_json, expenses_json,
                              contractors_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 status = excluded.status,
                 costing_note = excluded.costing_note,
                 line_id = excluded.line_id,
                 item = excluded.item,
                 unit = excluded.unit,
                 project_qty = excluded.project_qty,
                 start_date = excluded.start_date,
                 base_margin = excluded.base_margin,
                 s_margin = excluded.s_margin,
                 total_material_costs = excluded.total_material_costs,
                 total_labor_costs = excluded.total_labor_costs,
                 total_expenses = excluded.total_expenses,
                 total_contractors = excluded.total_contractors,
                 total_cost = excluded.total_cost,
                 material_costs_json = excluded.material_costs_json,
                 labor_costs_json = excluded.labor_costs_json,
                 expenses_json = excluded.expenses_json,
                 contractors_json = excluded.contractors_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&name.0)
        .bind(boq.status.as_str())
        .bind(boq.costing_note.as_ref().map(|id| id.0.as_str()))
        .bind(boq.line_id.as_ref().map(|id| id.0.as_str()))
        .bind(boq.item.as_ref().map(|code| code.0.as_str()))
        .bind(&boq.unit)
        .bind(boq.project_qty)
        .bind(boq.start_date)
        .bind(boq.base_margin)
        .bind(boq.s_margin)
        .bind(boq.totals.total_material_costs)
        .bind(boq.totals.total_labor_costs)
        .bind(boq.totals.total_expenses)
        .bind(boq.totals.total_contractors)
        .bind(boq.totals.total_cost)
        .bind(rows_to_json("material_costs_json", &boq.material_costs)?)
        .bind(rows_to_json("labor_costs_json", &boq.labor_costs)?)
        .bind(rows_to_json("expenses_json", &boq.expenses)?)
        .bind(rows_to_json("contractors_json", &boq.contractors)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

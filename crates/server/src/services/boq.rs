use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tally_core::costing::rollup::{apply_unit_costs, referenced_items};
use tally_core::costing::{recalc_totals, validate_boq, validate_costing_note, CostSource};
use tally_core::domain::boq::{Boq, BoqId, BoqTotals};
use tally_core::domain::costing_note::CostingNoteId;
use tally_core::domain::RowId;
use tally_core::errors::DomainError;
use tally_core::lifecycle::DocStatus;
use tally_core::mapping::boq_from_costing_note_row;
use tally_core::propagation::{push_boq_cost_to_costing_note, PropagationOutcome};
use tracing::{debug, info};

use super::{non_blank, persistence, today, DocumentServices, ServiceResult, SubmitReport, BOQ_SERIES};

/// Parameters of "update BOQ costs"; every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCostsRequest {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub price_list: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateCostsReport {
    pub boq: BoqId,
    pub updated: usize,
    pub source: CostSource,
    pub price_list: String,
    pub warehouse: Option<String>,
    pub company: Option<String>,
    pub total_cost: f64,
}

/// BOQ costing a Costing Note row; `created` is false when an existing one was reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoqLink {
    pub costing_note: CostingNoteId,
    pub row_id: RowId,
    pub boq: BoqId,
    pub created: bool,
}

impl DocumentServices {
    /// BOQ save: edited header margins are pushed onto their rows, then every total is
    /// recomputed. Drafts only.
    pub async fn save_boq(&self, mut boq: Boq) -> ServiceResult<Boq> {
        let (name, previous) = match non_blank(boq.name.as_ref().map(|id| id.0.as_str())) {
            Some(name) => {
                let name = BoqId(name.to_string());
                let existing = self.boqs.find_by_name(&name).await.map_err(persistence)?;
                if let Some(existing) = &existing {
                    existing.status.ensure_editable("BOQ", &name.0)?;
                }
                (name, existing.map(|existing| existing.header_margins()))
            }
            None => (BoqId(self.allocate_name(BOQ_SERIES).await?), None),
        };

        boq.name = Some(name);
        boq.status = DocStatus::Draft;
        let (sync, totals) = validate_boq(&mut boq, previous);
        self.boqs.save(&boq).await.map_err(persistence)?;

        info!(
            event_name = "costing.boq.saved",
            boq = boq.display_name(),
            material_margin_synced = sync.material,
            labor_margin_synced = sync.labor,
            total_cost = totals.total_cost,
            "boq saved"
        );
        Ok(boq)
    }

    pub async fn get_boq(&self, name: &str) -> ServiceResult<Boq> {
        self.boqs
            .find_by_name(&BoqId(name.to_string()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("BOQ", name).into())
    }

    /// Submits a BOQ and hands its total cost to the Costing Note row it was built
    /// for. The Costing Note is re-priced and written only when that row changed; a
    /// link to a Costing Note that no longer exists skips propagation.
    pub async fn submit_boq(&self, name: &str) -> ServiceResult<SubmitReport<Boq>> {
        let mut boq = self.get_boq(name).await?;
        boq.status.transition_to(DocStatus::Submitted)?;
        recalc_totals(&mut boq);

        let mut linked = match &boq.costing_note {
            Some(id) => {
                let note = self.costing_notes.find_by_name(id).await.map_err(persistence)?;
                if note.is_none() {
                    debug!(
                        event_name = "costing.boq.costing_note_missing",
                        boq = boq.display_name(),
                        costing_note = %id.0,
                        "linked costing note not found; skipping cost propagation"
                    );
                }
                note
            }
            None => None,
        };
        self.boqs.save(&boq).await.map_err(persistence)?;

        let propagation = match linked.as_mut() {
            Some(note) => {
                let outcome = push_boq_cost_to_costing_note(&boq, note);
                if outcome.changed() {
                    validate_costing_note(note);
                    self.costing_notes.save(note).await.map_err(persistence)?;
                }
                outcome
            }
            None => PropagationOutcome::default(),
        };

        info!(
            event_name = "costing.boq.submitted",
            boq = boq.display_name(),
            total_cost = boq.totals.total_cost,
            changed_rows = propagation.changed_rows,
            "boq submitted"
        );
        Ok(SubmitReport { document: boq, propagation })
    }

    /// Reuses the BOQ already built for a Costing Note row or inserts a new draft, and
    /// links the row to it.
    pub async fn boq_for_costing_note_row(
        &self,
        costing_note: &str,
        row_id: &str,
    ) -> ServiceResult<BoqLink> {
        let row_id = RowId(row_id.trim().to_string());
        if row_id.0.is_empty() {
            return Err(DomainError::missing("the Costing Note row id").into());
        }
        let mut note = self.get_costing_note(costing_note).await?;
        let note_id = CostingNoteId(costing_note.to_string());

        let existing = self.boqs.find_by_source(&note_id, &row_id).await.map_err(persistence)?;
        let (boq, created) = match existing {
            Some(boq) => (boq, false),
            None => {
                let mut boq = boq_from_costing_note_row(&note_id, &note, &row_id, today())?;
                let name = BoqId(self.allocate_name(BOQ_SERIES).await?);
                boq.name = Some(name.clone());
                validate_boq(&mut boq, None);
                self.boqs.save(&boq).await.map_err(persistence)?;
                (name, true)
            }
        };

        let row = note
            .row_mut(&row_id)
            .ok_or_else(|| DomainError::not_found("Costing Note row", row_id.0.clone()))?;
        if row.boq_link.as_ref() != Some(&boq) {
            row.boq_link = Some(boq.clone());
            self.costing_notes.save(&note).await.map_err(persistence)?;
        }

        info!(
            event_name = "costing.boq.linked",
            costing_note = %note_id.0,
            row_id = %row_id,
            boq = %boq.0,
            created,
            "costing note row linked to boq"
        );
        Ok(BoqLink { costing_note: note_id, row_id, boq, created })
    }

    /// Recomputes every row and header total and persists them. Drafts only.
    pub async fn recompute_boq_totals(&self, name: &str) -> ServiceResult<BoqTotals> {
        let mut boq = self.get_boq(name).await?;
        boq.status.ensure_editable("BOQ", name)?;
        let totals = recalc_totals(&mut boq);
        self.boqs.save(&boq).await.map_err(persistence)?;
        Ok(totals)
    }

    /// Refreshes row unit costs from the chosen price source, then recomputes and
    /// persists the BOQ. Drafts only.
    pub async fn update_boq_costs(
        &self,
        name: &str,
        request: UpdateCostsRequest,
    ) -> ServiceResult<UpdateCostsReport> {
        let mut boq = self.get_boq(name).await?;
        boq.status.ensure_editable("BOQ", name)?;
        let source = CostSource::parse_lenient(request.source.as_deref());
        let price_list = non_blank(request.price_list.as_deref())
            .unwrap_or(self.erp.default_price_list.as_str())
            .to_string();
        let warehouse = non_blank(request.warehouse.as_deref()).map(str::to_string);
        let company = self.company_or_default(request.company.as_deref());

        let mut unit_costs = HashMap::new();
        for item in referenced_items(&boq) {
            let cost = match source {
                CostSource::PriceList => self
                    .prices
                    .latest_buying_price(&item, &price_list)
                    .await
                    .map_err(persistence)?,
                CostSource::Valuation => {
                    self.prices.valuation_rate(&item, warehouse.as_deref()).await
                }
                CostSource::LastPurchase => {
                    self.prices.last_purchase_rate(&item).await.map_err(persistence)?
                }
            };
            unit_costs.insert(item, cost);
        }

        let updated =
            apply_unit_costs(&mut boq, |item| unit_costs.get(item).copied().unwrap_or(0.0));
        let totals = recalc_totals(&mut boq);
        self.boqs.save(&boq).await.map_err(persistence)?;

        info!(
            event_name = "costing.boq.costs_updated",
            boq = boq.display_name(),
            source = source.as_str(),
            updated,
            total_cost = totals.total_cost,
            "boq costs updated"
        );
        Ok(UpdateCostsReport {
            boq: BoqId(name.to_string()),
            updated,
            source,
            price_list,
            warehouse,
            company,
            total_cost: totals.total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use tally_core::costing::CostSource;
    use tally_core::domain::boq::Boq;
    use tally_core::domain::costing_note::CostingNote;
    use tally_core::errors::{ApplicationError, DomainError};
    use tally_core::lifecycle::DocStatus;

    use super::UpdateCostsRequest;
    use crate::services::test_support::seeded;
    use crate::services::DocumentServices;

    fn boq(value: serde_json::Value) -> Boq {
        serde_json::from_value(value).expect("boq")
    }

    async fn saved_note(services: &DocumentServices) -> CostingNote {
        let note: CostingNote = serde_json::from_value(serde_json::json!({
            "opportunity": "OPP-2026-00001",
            "default_profit_margin": 10,
            "items": [{ "id": "row-1", "item": "ACME-PNL-001", "uom": "Nos", "qty": 12, "cost": 0 }]
        }))
        .expect("note");
        services.save_costing_note(note).await.expect("save note")
    }

    #[tokio::test]
    async fn save_rolls_up_rows_and_syncs_header_margins_only_when_edited() {
        let services = seeded().await;
        let saved = services
            .save_boq(boq(serde_json::json!({
                "base_margin": 10,
                "s_margin": 0,
                "material_costs": [{ "item": "MTR-PNL-001", "qty": 2, "direct_cost": 100, "margin": 50 }],
                "expenses": [{ "description": "Freight", "qty": 1, "cost": 50 }]
            })))
            .await
            .expect("first save");

        assert_eq!(saved.material_costs[0].margin, 10.0, "first save pushes header margins");
        assert_eq!(saved.material_costs[0].total_cost, 220.0);
        assert_eq!(saved.totals.total_material_costs, 220.0);
        assert_eq!(saved.totals.total_expenses, 50.0);
        assert_eq!(saved.totals.total_cost, 270.0);

        let mut edited = saved.clone();
        edited.material_costs[0].margin = 20.0;
        let resaved = services.save_boq(edited).await.expect("row edit");
        assert_eq!(resaved.material_costs[0].margin, 20.0, "row edits survive an unchanged header");

        let mut header = resaved.clone();
        header.base_margin = 5.0;
        let resaved = services.save_boq(header).await.expect("header edit");
        assert_eq!(resaved.material_costs[0].margin, 5.0);
        assert_eq!(resaved.totals.total_cost, 260.0);
    }

    #[tokio::test]
    async fn costing_note_rows_get_one_boq_each() {
        let services = seeded().await;
        let note = saved_note(&services).await;
        let note_name = note.name.clone().expect("named").0;

        let first = services.boq_for_costing_note_row(&note_name, "row-1").await.expect("create");
        assert!(first.created);
        let again = services.boq_for_costing_note_row(&note_name, "row-1").await.expect("reuse");
        assert!(!again.created);
        assert_eq!(again.boq, first.boq);

        let boq = services.get_boq(&first.boq.0).await.expect("load boq");
        assert_eq!(boq.project_qty, 12.0);
        assert_eq!(boq.unit.as_deref(), Some("Nos"));
        let note = services.get_costing_note(&note_name).await.expect("load note");
        assert_eq!(note.items[0].boq_link, Some(first.boq.clone()));

        let blank = services.boq_for_costing_note_row(&note_name, " ").await.expect_err("blank");
        assert_eq!(blank, ApplicationError::Domain(DomainError::missing("the Costing Note row id")));
        let missing = services.boq_for_costing_note_row(&note_name, "row-9").await.expect_err("row");
        assert!(matches!(missing, ApplicationError::Domain(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn submit_pushes_total_cost_into_the_costing_note_once() {
        let services = seeded().await;
        let note = saved_note(&services).await;
        let note_name = note.name.clone().expect("named").0;
        let link = services.boq_for_costing_note_row(&note_name, "row-1").await.expect("create");

        let mut draft = services.get_boq(&link.boq.0).await.expect("load");
        draft.material_costs = serde_json::from_value(serde_json::json!([
            { "item": "MTR-PNL-001", "qty": 2, "direct_cost": 100 }
        ]))
        .expect("rows");
        draft.base_margin = 20.0;
        services.save_boq(draft).await.expect("save");

        let report = services.submit_boq(&link.boq.0).await.expect("submit");
        assert_eq!(report.document.status, DocStatus::Submitted);
        assert_eq!(report.document.totals.total_cost, 240.0);
        assert!(report.propagation.changed());

        let note = services.get_costing_note(&note_name).await.expect("note");
        assert_eq!(note.items[0].cost, 240.0);
        assert_eq!(note.items[0].total_cost, 2880.0);
        assert_eq!(note.items[0].target_selling_price, 264.0);
        assert_eq!(note.totals.total_cost, 2880.0);

        let locked = services.save_boq(report.document).await.expect_err("submitted");
        assert!(matches!(locked, ApplicationError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn submit_skips_propagation_when_the_costing_note_is_gone() {
        let services = seeded().await;
        let saved = services
            .save_boq(boq(serde_json::json!({
                "costing_note": "CN-2026-09999",
                "line_id": "row-1",
                "expenses": [{ "description": "Freight", "qty": 1, "cost": 2 }]
            })))
            .await
            .expect("save");
        let name = saved.name.clone().expect("named").0;

        let report = services.submit_boq(&name).await.expect("submit without a costing note");
        assert_eq!(report.document.status, DocStatus::Submitted);
        assert!(!report.propagation.changed());
        assert_eq!(services.get_boq(&name).await.expect("load").status, DocStatus::Submitted);
    }

    #[tokio::test]
    async fn submitted_boqs_reject_cost_refresh_and_recompute() {
        let services = seeded().await;
        let saved = services
            .save_boq(boq(serde_json::json!({
                "material_costs": [{ "item": "MTR-PNL-001", "qty": 2, "direct_cost": 1 }]
            })))
            .await
            .expect("save");
        let name = saved.name.clone().expect("named").0;
        services.submit_boq(&name).await.expect("submit");

        let refresh = services
            .update_boq_costs(&name, UpdateCostsRequest::default())
            .await
            .expect_err("submitted boq is read-only");
        assert!(matches!(refresh, ApplicationError::Domain(DomainError::InvariantViolation(_))));
        let recompute = services.recompute_boq_totals(&name).await.expect_err("read-only");
        assert!(matches!(recompute, ApplicationError::Domain(DomainError::InvariantViolation(_))));

        let stored = services.get_boq(&name).await.expect("load");
        assert_eq!(stored.totals.total_cost, 2.0);
    }

    #[tokio::test]
    async fn update_costs_reads_each_source_and_persists_totals() {
        let services = seeded().await;
        let saved = services
            .save_boq(boq(serde_json::json!({
                "material_costs": [
                    { "item": "MTR-PNL-001", "qty": 2, "direct_cost": 1 },
                    { "item": "MTR-FRM-001", "qty": 1, "direct_cost": 1 }
                ],
                "contractors": [{ "item": "SRV-001", "qty": 2, "cost": 1 }],
                "expenses": [{ "description": "Parking", "qty": 1, "cost": 15 }]
            })))
            .await
            .expect("save");
        let name = saved.name.clone().expect("named").0;

        let report = services
            .update_boq_costs(&name, UpdateCostsRequest::default())
            .await
            .expect("price list");
        assert_eq!(report.source, CostSource::PriceList);
        assert_eq!(report.price_list, "Standard Buying");
        assert_eq!(report.company.as_deref(), Some("Connect Manufacturing"));
        assert_eq!(report.updated, 3);
        assert_eq!(report.total_cost, 40.0 + 35.0 + 800.0 + 15.0);

        let report = services
            .update_boq_costs(
                &name,
                UpdateCostsRequest { source: Some("valuation".to_string()), ..UpdateCostsRequest::default() },
            )
            .await
            .expect("valuation");
        assert_eq!(report.total_cost, 37.0 + 33.25 + 0.0 + 15.0);

        let report = services
            .update_boq_costs(
                &name,
                UpdateCostsRequest { source: Some("last_purchase".to_string()), ..UpdateCostsRequest::default() },
            )
            .await
            .expect("last purchase");
        assert_eq!(report.total_cost, 38.0 + 15.0);

        let stored = services.get_boq(&name).await.expect("load");
        assert_eq!(stored.totals.total_cost, 53.0);
        assert_eq!(services.recompute_boq_totals(&name).await.expect("recompute").total_cost, 53.0);

        let missing = services
            .update_boq_costs("BOQ-2026-09999", UpdateCostsRequest::default())
            .await
            .expect_err("missing");
        assert_eq!(
            missing,
            ApplicationError::Domain(DomainError::not_found("BOQ", "BOQ-2026-09999"))
        );
    }
}

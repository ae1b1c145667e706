use tally_core::costing::validate_costing_note;
use tally_core::domain::costing_note::{CostingNote, CostingNoteId};
use tally_core::domain::opportunity::{Opportunity, OpportunityId, Quotation};
use tally_core::errors::DomainError;
use tally_core::lifecycle::DocStatus;
use tally_core::mapping::{costing_note_from_opportunity, quotation_from_opportunity};
use tally_core::propagation::{push_rates_to_opportunity, PropagationOutcome};
use tracing::info;

use super::{
    non_blank, persistence, DocumentServices, ServiceResult, SubmitReport, COSTING_NOTE_SERIES,
    OPPORTUNITY_SERIES,
};

impl DocumentServices {
    /// Opportunity save: validate hook fills blank amounts, drafts only.
    pub async fn save_opportunity(&self, mut opportunity: Opportunity) -> ServiceResult<Opportunity> {
        let name = match non_blank(opportunity.name.as_ref().map(|id| id.0.as_str())) {
            Some(name) => {
                let name = OpportunityId(name.to_string());
                if let Some(existing) =
                    self.opportunities.find_by_name(&name).await.map_err(persistence)?
                {
                    existing.status.ensure_editable("Opportunity", &name.0)?;
                }
                name
            }
            None => OpportunityId(self.allocate_name(OPPORTUNITY_SERIES).await?),
        };

        opportunity.name = Some(name);
        opportunity.status = DocStatus::Draft;
        opportunity.fill_missing_amounts();
        self.opportunities.save(&opportunity).await.map_err(persistence)?;

        info!(
            event_name = "selling.opportunity.saved",
            opportunity = opportunity.display_name(),
            "opportunity saved"
        );
        Ok(opportunity)
    }

    pub async fn get_opportunity(&self, name: &str) -> ServiceResult<Opportunity> {
        self.opportunities
            .find_by_name(&OpportunityId(name.to_string()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Opportunity", name).into())
    }

    pub async fn submit_opportunity(&self, name: &str) -> ServiceResult<Opportunity> {
        let mut opportunity = self.get_opportunity(name).await?;
        opportunity.status.transition_to(DocStatus::Submitted)?;
        opportunity.fill_missing_amounts();
        self.opportunities.save(&opportunity).await.map_err(persistence)?;
        Ok(opportunity)
    }

    /// Unsaved Costing Note prefilled from an opportunity.
    pub async fn costing_note_for_opportunity(&self, name: &str) -> ServiceResult<CostingNote> {
        let opportunity = self.get_opportunity(name).await?;
        Ok(costing_note_from_opportunity(&opportunity))
    }

    /// Unsaved Quotation built from an opportunity and its standard products.
    pub async fn quotation_for_opportunity(&self, name: &str) -> ServiceResult<Quotation> {
        let opportunity = self.get_opportunity(name).await?;
        Ok(quotation_from_opportunity(&opportunity))
    }

    /// Costing Note save: recomputes selling prices and totals, drafts only.
    pub async fn save_costing_note(&self, mut note: CostingNote) -> ServiceResult<CostingNote> {
        let name = match non_blank(note.name.as_ref().map(|id| id.0.as_str())) {
            Some(name) => {
                let name = CostingNoteId(name.to_string());
                if let Some(existing) =
                    self.costing_notes.find_by_name(&name).await.map_err(persistence)?
                {
                    existing.status.ensure_editable("Costing Note", &name.0)?;
                }
                name
            }
            None => CostingNoteId(self.allocate_name(COSTING_NOTE_SERIES).await?),
        };

        note.name = Some(name);
        note.status = DocStatus::Draft;
        let totals = validate_costing_note(&mut note);
        self.costing_notes.save(&note).await.map_err(persistence)?;

        info!(
            event_name = "selling.costing_note.saved",
            costing_note = note.display_name(),
            total_cost = totals.total_cost,
            total_target_selling_price = totals.total_target_selling_price,
            "costing note saved"
        );
        Ok(note)
    }

    pub async fn get_costing_note(&self, name: &str) -> ServiceResult<CostingNote> {
        self.costing_notes
            .find_by_name(&CostingNoteId(name.to_string()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Costing Note", name).into())
    }

    /// Submits a Costing Note and pushes its target selling prices onto the linked
    /// opportunity. The opportunity is only written when a rate changed.
    pub async fn submit_costing_note(&self, name: &str) -> ServiceResult<SubmitReport<CostingNote>> {
        let mut note = self.get_costing_note(name).await?;
        note.status.transition_to(DocStatus::Submitted)?;
        validate_costing_note(&mut note);

        let mut linked = match &note.opportunity {
            Some(id) => Some(self.get_opportunity(&id.0).await?),
            None => None,
        };
        self.costing_notes.save(&note).await.map_err(persistence)?;

        let propagation = match linked.as_mut() {
            Some(opportunity) => {
                let outcome = push_rates_to_opportunity(&note, opportunity);
                if outcome.changed() {
                    opportunity.fill_missing_amounts();
                    self.opportunities.save(opportunity).await.map_err(persistence)?;
                }
                outcome
            }
            None => PropagationOutcome::default(),
        };

        info!(
            event_name = "selling.costing_note.submitted",
            costing_note = note.display_name(),
            matched_rows = propagation.matched_rows,
            changed_rows = propagation.changed_rows,
            "costing note submitted"
        );
        Ok(SubmitReport { document: note, propagation })
    }
}

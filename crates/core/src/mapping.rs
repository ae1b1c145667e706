use chrono::NaiveDate;

use crate::domain::boq::Boq;
use crate::domain::costing_note::{CostingNote, CostingNoteId, CostingNoteItem};
use crate::domain::opportunity::{Opportunity, Quotation, QuotationItem};
use crate::domain::RowId;
use crate::errors::DomainError;

/// Unsaved Costing Note for an opportunity: party and one row per opportunity line.
pub fn costing_note_from_opportunity(opportunity: &Opportunity) -> CostingNote {
    let items = opportunity
        .items
        .iter()
        .map(|line| {
            let mut row = CostingNoteItem::new(Some(line.item_code.clone()), line.qty);
            row.item_name = line.item_name.clone();
            row.uom = line.uom.clone();
            row
        })
        .collect();

    CostingNote {
        opportunity: opportunity.name.clone(),
        party_type: opportunity.opportunity_from.clone(),
        party_name: opportunity.party_name.clone(),
        items,
        ..CostingNote::default()
    }
}

/// New draft BOQ costing a single Costing Note row.
pub fn boq_from_costing_note_row(
    note_name: &CostingNoteId,
    note: &CostingNote,
    row_id: &RowId,
    today: NaiveDate,
) -> Result<Boq, DomainError> {
    if row_id.0.trim().is_empty() {
        return Err(DomainError::missing("the Costing Note row id"));
    }
    let row = note
        .row(row_id)
        .ok_or_else(|| DomainError::not_found("Costing Note row", row_id.0.clone()))?;

    Ok(Boq {
        costing_note: Some(note_name.clone()),
        line_id: Some(row.id.clone()),
        item: row.item.clone(),
        unit: row.uom.clone(),
        project_qty: if row.qty == 0.0 { 1.0 } else { row.qty },
        start_date: Some(today),
        ..Boq::default()
    })
}

/// Quotation from an opportunity: its lines first, then the standard products table.
pub fn quotation_from_opportunity(opportunity: &Opportunity) -> Quotation {
    let core_rows = opportunity.items.iter().map(|line| {
        let rate = line.rate.unwrap_or(0.0);
        QuotationItem {
            item_code: Some(line.item_code.clone()),
            item_name: line.item_name.clone(),
            description: None,
            uom: line.uom.clone(),
            conversion_factor: 1.0,
            qty: line.qty,
            rate,
            amount: line.amount.unwrap_or(rate * line.qty),
        }
    });

    let standard_rows = opportunity.standard_items.iter().map(|row| QuotationItem {
        item_code: row.item.clone(),
        item_name: row.item_name.clone(),
        description: row.description.clone(),
        uom: row.uom.clone(),
        conversion_factor: 1.0,
        qty: row.qty,
        rate: row.rate,
        amount: row.amount.unwrap_or(row.qty * row.rate),
    });

    let mut quotation = Quotation {
        opportunity: opportunity.name.clone(),
        quotation_to: opportunity.opportunity_from.clone(),
        party_name: opportunity.party_name.clone(),
        company: opportunity.company.clone(),
        items: core_rows.chain(standard_rows).collect(),
        total_qty: 0.0,
        net_total: 0.0,
        grand_total: 0.0,
    };
    quotation.calculate_totals();
    quotation
}

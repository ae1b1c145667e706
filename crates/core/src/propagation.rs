//! Copies computed prices from a submitted document onto the documents it feeds.
//!
//! Propagation is one-directional and runs once per submit. Targets are only
//! rewritten where a value actually differs so unchanged re-runs produce no writes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::boq::Boq;
use crate::domain::costing_note::CostingNote;
use crate::domain::opportunity::Opportunity;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationOutcome {
    /// Target rows that matched a source row.
    pub matched_rows: usize,
    /// Target rows whose values were rewritten.
    pub changed_rows: usize,
}

impl PropagationOutcome {
    pub fn changed(&self) -> bool {
        self.changed_rows > 0
    }
}

/// BOQ submit: the Costing Note row the BOQ was created from takes the BOQ's total
/// cost as its unit cost and links back to the BOQ.
pub fn push_boq_cost_to_costing_note(boq: &Boq, note: &mut CostingNote) -> PropagationOutcome {
    let Some(line_id) = boq.line_id.as_ref() else {
        return PropagationOutcome::default();
    };
    let Some(row) = note.row_mut(line_id) else {
        return PropagationOutcome::default();
    };

    let new_cost = boq.totals.total_cost;
    let cost_changed = row.cost != new_cost;
    let link_changed = row.boq_link.as_ref() != boq.name.as_ref();

    if cost_changed {
        row.cost = new_cost;
        row.total_cost = new_cost * row.qty;
    }
    if link_changed {
        row.boq_link = boq.name.clone();
    }

    PropagationOutcome {
        matched_rows: 1,
        changed_rows: usize::from(cost_changed || link_changed),
    }
}

/// Costing Note submit: Opportunity lines take the target selling price of the
/// Costing Note row with the same item code. The first Costing Note row wins when an
/// item appears more than once.
pub fn push_rates_to_opportunity(note: &CostingNote, opportunity: &mut Opportunity) -> PropagationOutcome {
    let mut rate_by_item: HashMap<&str, f64> = HashMap::new();
    for row in &note.items {
        if let Some(item) = row.item.as_ref().filter(|item| !item.0.is_empty()) {
            rate_by_item.entry(item.0.as_str()).or_insert(row.target_selling_price);
        }
    }

    let mut outcome = PropagationOutcome::default();
    for line in &mut opportunity.items {
        let Some(&new_rate) = rate_by_item.get(line.item_code.0.as_str()) else {
            continue;
        };
        outcome.matched_rows += 1;

        if line.rate.unwrap_or(0.0) != new_rate {
            let amount = new_rate * line.qty;
            line.rate = Some(new_rate);
            line.base_rate = Some(new_rate);
            line.amount = Some(amount);
            line.base_amount = Some(amount);
            outcome.changed_rows += 1;
        }
    }

    outcome
}

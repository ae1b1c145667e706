use crate::domain::costing_note::{CostingNote, CostingNoteItem, CostingNoteTotals};
use crate::domain::truthy;

/// Costing Note validate hook: target selling prices first, then row and header totals.
pub fn validate_costing_note(note: &mut CostingNote) -> CostingNoteTotals {
    update_target_selling_prices(note);
    rollup_totals(note)
}

/// Margin precedence: row margin, document default margin, legacy header margin, zero.
/// A blank or zero margin at any level defers to the next one.
pub fn resolve_margin(note: &CostingNote, row: &CostingNoteItem) -> f64 {
    truthy(row.default_profit_margin)
        .or_else(|| truthy(note.default_profit_margin))
        .or_else(|| truthy(note.legacy_profit_margin))
        .unwrap_or(0.0)
}

pub fn target_selling_price(cost: f64, margin_pct: f64) -> f64 {
    if cost == 0.0 {
        return 0.0;
    }
    cost + cost * margin_pct / 100.0
}

pub fn update_target_selling_prices(note: &mut CostingNote) {
    let margins: Vec<f64> = note.items.iter().map(|row| resolve_margin(note, row)).collect();
    for (row, margin) in note.items.iter_mut().zip(margins) {
        row.target_selling_price = target_selling_price(row.cost, margin);
    }
}

pub fn rollup_totals(note: &mut CostingNote) -> CostingNoteTotals {
    let mut total_cost = 0.0;
    let mut total_target_selling_price = 0.0;

    for row in &mut note.items {
        row.total_cost = row.cost * row.qty;
        row.total_selling = row.target_selling_price * row.qty;
        total_cost += row.total_cost;
        total_target_selling_price += row.total_selling;
    }

    let total_profit = total_target_selling_price - total_cost;
    note.totals = CostingNoteTotals {
        total_cost,
        total_target_selling_price,
        total_profit,
        profit_margin: profit_margin_ratio(total_profit, total_cost),
    };
    note.totals
}

pub fn profit_margin_ratio(total_profit: f64, total_cost: f64) -> f64 {
    if total_cost == 0.0 {
        0.0
    } else {
        total_profit / total_cost
    }
}

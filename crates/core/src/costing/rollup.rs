use crate::domain::boq::{Boq, BoqTotals, FlatRow, HeaderMargins, MarginRow};
use crate::domain::item::ItemCode;

/// Which header margins were pushed onto their rows by [`sync_row_margins`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarginSync {
    pub material: bool,
    pub labor: bool,
}

/// BOQ validate hook: push edited header margins onto their rows, then recompute.
///
/// `previous` is the header as last persisted; `None` for a document that was never
/// saved, in which case both header margins are pushed.
pub fn validate_boq(boq: &mut Boq, previous: Option<HeaderMargins>) -> (MarginSync, BoqTotals) {
    let sync = sync_row_margins(boq, previous);
    let totals = recalc_totals(boq);
    (sync, totals)
}

pub fn sync_row_margins(boq: &mut Boq, previous: Option<HeaderMargins>) -> MarginSync {
    let base_changed = previous.map_or(true, |prev| prev.base_margin != boq.base_margin);
    let s_changed = previous.map_or(true, |prev| prev.s_margin != boq.s_margin);

    if base_changed {
        for row in &mut boq.material_costs {
            row.margin = boq.base_margin;
        }
    }
    if s_changed {
        for row in &mut boq.labor_costs {
            row.margin = boq.s_margin;
        }
    }

    MarginSync { material: base_changed, labor: s_changed }
}

/// Recomputes every row and the header totals, returning the new totals.
pub fn recalc_totals(boq: &mut Boq) -> BoqTotals {
    let total_material_costs = recalc_margin_rows(&mut boq.material_costs);
    let total_labor_costs = recalc_margin_rows(&mut boq.labor_costs);
    let total_expenses = recalc_flat_rows(&mut boq.expenses);
    let total_contractors = recalc_flat_rows(&mut boq.contractors);

    boq.totals = BoqTotals {
        total_material_costs,
        total_labor_costs,
        total_expenses,
        total_contractors,
        total_cost: total_material_costs + total_labor_costs + total_expenses + total_contractors,
    };
    boq.totals
}

/// Overwrites the unit cost of every row that references an item: `direct_cost` on
/// material and labor rows, `cost` on expense and contractor rows. Returns how many
/// rows were touched. Totals are not recomputed here.
pub fn apply_unit_costs<F>(boq: &mut Boq, mut unit_cost: F) -> usize
where
    F: FnMut(&ItemCode) -> f64,
{
    let mut updated = 0;
    for row in boq.material_costs.iter_mut().chain(boq.labor_costs.iter_mut()) {
        if let Some(item) = &row.item {
            row.direct_cost = unit_cost(item);
            updated += 1;
        }
    }
    for row in boq.expenses.iter_mut().chain(boq.contractors.iter_mut()) {
        if let Some(item) = &row.item {
            row.cost = unit_cost(item);
            updated += 1;
        }
    }
    updated
}

/// Item codes referenced anywhere in the BOQ, deduplicated in first-seen order.
pub fn referenced_items(boq: &Boq) -> Vec<ItemCode> {
    let margin_items = boq.material_costs.iter().chain(&boq.labor_costs).map(|row| &row.item);
    let flat_items = boq.expenses.iter().chain(&boq.contractors).map(|row| &row.item);

    let mut seen = Vec::new();
    for item in margin_items.chain(flat_items).flatten() {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

pub fn margin_cost(direct_cost: f64, margin_pct: f64) -> f64 {
    direct_cost + direct_cost * margin_pct / 100.0
}

fn recalc_margin_rows(rows: &mut [MarginRow]) -> f64 {
    let mut table_sum = 0.0;
    for row in rows {
        row.cost = margin_cost(row.direct_cost, row.margin);
        row.total_cost = row.cost * row.qty;
        table_sum += row.total_cost;
    }
    table_sum
}

fn recalc_flat_rows(rows: &mut [FlatRow]) -> f64 {
    let mut table_sum = 0.0;
    for row in rows {
        row.total_cost = row.cost * row.qty;
        table_sum += row.total_cost;
    }
    table_sum
}

#[cfg(test)]
mod tests {
    use super::{
        apply_unit_costs, margin_cost, recalc_totals, referenced_items, validate_boq, MarginSync,
    };
    use crate::domain::boq::{Boq, FlatRow, HeaderMargins, MarginRow};
    use crate::domain::item::ItemCode;
    use crate::domain::RowId;

    fn margin_row(direct_cost: f64, margin: f64, qty: f64) -> MarginRow {
        MarginRow {
            id: RowId::generate(),
            item: None,
            description: None,
            qty,
            direct_cost,
            margin,
            cost: 0.0,
            total_cost: 0.0,
        }
    }

    fn flat_row(cost: f64, qty: f64) -> FlatRow {
        FlatRow { id: RowId::generate(), item: None, description: None, qty, cost, total_cost: 0.0 }
    }

    #[test]
    fn margin_rows_derive_cost_and_total() {
        assert_eq!(margin_cost(100.0, 20.0), 120.0);

        let mut boq = Boq { material_costs: vec![margin_row(100.0, 20.0, 3.0)], ..Boq::default() };
        recalc_totals(&mut boq);
        assert_eq!(boq.material_costs[0].cost, 120.0);
        assert_eq!(boq.material_costs[0].total_cost, 360.0);
    }

    #[test]
    fn header_totals_sum_each_category() {
        let mut boq = Boq {
            base_margin: 10.0,
            material_costs: vec![margin_row(100.0, 10.0, 2.0)],
            labor_costs: vec![margin_row(50.0, 0.0, 1.0)],
            ..Boq::default()
        };

        let (_, totals) = validate_boq(&mut boq, None);

        assert_eq!(totals.total_material_costs, 220.0);
        assert_eq!(totals.total_labor_costs, 50.0);
        assert_eq!(totals.total_cost, 270.0);
        assert_eq!(boq.totals, totals);
    }

    #[test]
    fn flat_rows_ignore_margin() {
        let mut boq = Boq {
            base_margin: 50.0,
            s_margin: 50.0,
            expenses: vec![flat_row(40.0, 2.5)],
            contractors: vec![flat_row(1000.0, 1.0), flat_row(250.0, 2.0)],
            ..Boq::default()
        };

        let (_, totals) = validate_boq(&mut boq, None);

        assert_eq!(totals.total_expenses, 100.0);
        assert_eq!(totals.total_contractors, 1500.0);
        assert_eq!(totals.total_cost, 1600.0);
    }

    #[test]
    fn first_save_pushes_both_header_margins() {
        let mut boq = Boq {
            base_margin: 15.0,
            s_margin: 5.0,
            material_costs: vec![margin_row(10.0, 99.0, 1.0)],
            labor_costs: vec![margin_row(10.0, 99.0, 1.0)],
            ..Boq::default()
        };

        let (sync, _) = validate_boq(&mut boq, None);

        assert_eq!(sync, MarginSync { material: true, labor: true });
        assert_eq!(boq.material_costs[0].margin, 15.0);
        assert_eq!(boq.labor_costs[0].margin, 5.0);
    }

    #[test]
    fn unchanged_header_keeps_user_edited_row_margins() {
        let mut boq = Boq {
            base_margin: 15.0,
            s_margin: 5.0,
            material_costs: vec![margin_row(100.0, 30.0, 1.0)],
            labor_costs: vec![margin_row(100.0, 2.0, 1.0)],
            ..Boq::default()
        };
        let persisted = HeaderMargins { base_margin: 15.0, s_margin: 5.0 };

        let (sync, totals) = validate_boq(&mut boq, Some(persisted));

        assert_eq!(sync, MarginSync::default());
        assert_eq!(boq.material_costs[0].margin, 30.0);
        assert_eq!(boq.labor_costs[0].margin, 2.0);
        assert_eq!(totals.total_cost, 130.0 + 102.0);
    }

    #[test]
    fn changed_header_overwrites_only_its_category() {
        let mut boq = Boq {
            base_margin: 25.0,
            s_margin: 5.0,
            material_costs: vec![margin_row(100.0, 30.0, 1.0), margin_row(200.0, 0.0, 1.0)],
            labor_costs: vec![margin_row(100.0, 2.0, 1.0)],
            ..Boq::default()
        };
        let persisted = HeaderMargins { base_margin: 15.0, s_margin: 5.0 };

        let (sync, _) = validate_boq(&mut boq, Some(persisted));

        assert_eq!(sync, MarginSync { material: true, labor: false });
        assert!(boq.material_costs.iter().all(|row| row.margin == 25.0));
        assert_eq!(boq.labor_costs[0].margin, 2.0);
    }

    #[test]
    fn header_cleared_to_zero_resets_its_rows() {
        let mut boq = Boq {
            base_margin: 0.0,
            s_margin: 10.0,
            material_costs: vec![margin_row(100.0, 10.0, 1.0)],
            labor_costs: vec![margin_row(100.0, 10.0, 1.0)],
            ..Boq::default()
        };
        let persisted = HeaderMargins { base_margin: 10.0, s_margin: 10.0 };

        let (sync, totals) = validate_boq(&mut boq, Some(persisted));

        assert_eq!(sync, MarginSync { material: true, labor: false });
        assert_eq!(boq.material_costs[0].margin, 0.0);
        assert_eq!(totals.total_material_costs, 100.0);
        assert_eq!(totals.total_labor_costs, 110.0);
    }

    #[test]
    fn unit_costs_land_on_the_cost_field_of_each_category() {
        let mut material = margin_row(1.0, 10.0, 2.0);
        material.item = Some(ItemCode("MTR-PNL-001".to_string()));
        let unlinked = margin_row(7.0, 0.0, 1.0);
        let mut contractor = flat_row(1.0, 3.0);
        contractor.item = Some(ItemCode("SRV-001".to_string()));

        let mut boq = Boq {
            material_costs: vec![material, unlinked],
            contractors: vec![contractor],
            ..Boq::default()
        };

        let updated = apply_unit_costs(&mut boq, |item| match item.0.as_str() {
            "MTR-PNL-001" => 50.0,
            _ => 20.0,
        });
        recalc_totals(&mut boq);

        assert_eq!(updated, 2);
        assert_eq!(boq.material_costs[0].direct_cost, 50.0);
        assert_eq!(boq.material_costs[1].direct_cost, 7.0, "rows without an item keep cost");
        assert_eq!(boq.contractors[0].cost, 20.0);
        assert_eq!(boq.totals.total_cost, 110.0 + 7.0 + 60.0);
        assert_eq!(
            referenced_items(&boq),
            vec![ItemCode("MTR-PNL-001".to_string()), ItemCode("SRV-001".to_string())]
        );
    }
}

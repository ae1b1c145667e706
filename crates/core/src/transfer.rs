use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::item::default_stock_uom;
use crate::domain::stock::{
    ItemStockDefaults, PickList, StockEntry, StockEntryItem, WorkOrder,
};
use crate::errors::DomainError;

pub const MATERIAL_TRANSFER_FOR_MANUFACTURE: &str = "Material Transfer for Manufacture";

/// Work order of a pick list: the header link, else the first row that carries one.
pub fn linked_work_order(pick_list: &PickList) -> Result<&str, DomainError> {
    pick_list
        .work_order
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| {
            pick_list
                .locations
                .iter()
                .find_map(|row| row.work_order.as_deref().filter(|name| !name.is_empty()))
        })
        .ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "Pick List {} is not linked to a Work Order",
                pick_list.name
            ))
        })
}

/// Builds the stock entry moving picked material into the work order's WIP warehouse.
///
/// `defaults` is keyed by item code; items without an entry fall back to `Nos` and
/// no source warehouse.
pub fn build_material_transfer(
    pick_list: &PickList,
    work_order: &WorkOrder,
    defaults: &HashMap<String, ItemStockDefaults>,
    now: NaiveDateTime,
) -> Result<StockEntry, DomainError> {
    let wip_warehouse = work_order
        .wip_warehouse
        .as_deref()
        .filter(|warehouse| !warehouse.is_empty())
        .ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "Work Order {} has no WIP Warehouse. Please set it first.",
                work_order.name
            ))
        })?;

    if pick_list.locations.is_empty() {
        return Err(DomainError::InvariantViolation(format!(
            "Pick List {} has no rows",
            pick_list.name
        )));
    }

    let mut items = Vec::with_capacity(pick_list.locations.len());
    for row in &pick_list.locations {
        let item_code = row
            .item_code
            .clone()
            .filter(|code| !code.0.is_empty())
            .ok_or_else(|| DomainError::missing("the Item Code on every Pick List row"))?;

        let item_defaults = defaults.get(&item_code.0).cloned().unwrap_or_default();
        let stock_uom = item_defaults.stock_uom.unwrap_or_else(default_stock_uom);
        let qty = crate::domain::truthy(row.qty).or(row.stock_qty).unwrap_or(0.0);
        let s_warehouse = [&row.warehouse, &row.s_warehouse]
            .into_iter()
            .flatten()
            .find(|warehouse| !warehouse.is_empty())
            .cloned()
            .or(item_defaults.default_warehouse);

        items.push(StockEntryItem {
            item_code,
            qty,
            uom: row.uom.clone().filter(|uom| !uom.is_empty()).unwrap_or_else(|| stock_uom.clone()),
            stock_uom,
            s_warehouse,
            t_warehouse: wip_warehouse.to_string(),
        });
    }

    Ok(StockEntry {
        name: None,
        stock_entry_type: MATERIAL_TRANSFER_FOR_MANUFACTURE.to_string(),
        company: pick_list.company.clone().or_else(|| work_order.company.clone()),
        posting_date: pick_list.posting_date.unwrap_or(now.date()),
        posting_time: pick_list.posting_time.unwrap_or(now.time()),
        from_bom: false,
        work_order: work_order.name.clone(),
        fg_completed_qty: 1.0,
        pick_list: pick_list.name.clone(),
        remarks: format!(
            "Created from Pick List {} for Work Order {}",
            pick_list.name, work_order.name
        ),
        items,
    })
}

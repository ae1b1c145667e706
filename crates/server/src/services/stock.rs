use std::collections::HashMap;

use chrono::{Local, SubsecRound};
use tally_core::domain::stock::{ItemStockDefaults, PickListRow, StockEntry};
use tally_core::errors::DomainError;
use tally_core::transfer::{build_material_transfer, linked_work_order};
use tracing::info;

use super::{non_blank, persistence, DocumentServices, ServiceResult, STOCK_ENTRY_SERIES};

impl DocumentServices {
    /// Creates and stores the material transfer for a pick list's work order.
    pub async fn stock_entry_from_pick_list(&self, name: &str) -> ServiceResult<StockEntry> {
        let name = non_blank(Some(name)).ok_or_else(|| DomainError::missing("the Pick List name"))?;
        let pick_list = self
            .stock
            .find_pick_list(name)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Pick List", name))?;

        let work_order_name = linked_work_order(&pick_list)?.to_string();
        let work_order = self
            .stock
            .find_work_order(&work_order_name)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Work Order", work_order_name.clone()))?;

        let company = pick_list
            .company
            .as_deref()
            .or(work_order.company.as_deref())
            .map(str::to_string)
            .or_else(|| self.erp.default_company.clone());
        let defaults = self.item_stock_defaults(&pick_list.locations, company.as_deref()).await?;

        let now = Local::now().naive_local().trunc_subsecs(0);
        let mut entry = build_material_transfer(&pick_list, &work_order, &defaults, now)?;
        entry.name = Some(self.allocate_name(STOCK_ENTRY_SERIES).await?);
        self.stock.insert_stock_entry(&entry).await.map_err(persistence)?;

        info!(
            event_name = "stock.entry.created",
            pick_list = %pick_list.name,
            work_order = %work_order.name,
            stock_entry = entry.name.as_deref().unwrap_or_default(),
            rows = entry.items.len(),
            "stock entry created from pick list"
        );
        Ok(entry)
    }

    async fn item_stock_defaults(
        &self,
        rows: &[PickListRow],
        company: Option<&str>,
    ) -> ServiceResult<HashMap<String, ItemStockDefaults>> {
        let mut defaults = HashMap::new();
        for code in rows.iter().filter_map(|row| row.item_code.as_ref()) {
            if defaults.contains_key(&code.0) {
                continue;
            }
            let item = self.items.find_by_code(code).await.map_err(persistence)?;
            let stock_uom = item.as_ref().map(|item| item.stock_uom.clone());
            let default_warehouse = match item.and_then(|item| item.item_group) {
                Some(group) => self.masters.group_default_warehouse(&group, company).await,
                None => None,
            };
            defaults.insert(code.0.clone(), ItemStockDefaults { stock_uom, default_warehouse });
        }
        Ok(defaults)
    }
}

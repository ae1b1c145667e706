use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::item::ItemCode;
use super::opt_flt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickListRow {
    #[serde(default)]
    pub item_code: Option<ItemCode>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub stock_qty: Option<f64>,
    #[serde(default)]
    pub warehouse: Option<String>,
    /// Source warehouse some pick lists carry instead of `warehouse`.
    #[serde(default)]
    pub s_warehouse: Option<String>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default)]
    pub work_order: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickList {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub work_order: Option<String>,
    #[serde(default)]
    pub posting_date: Option<NaiveDate>,
    #[serde(default)]
    pub posting_time: Option<NaiveTime>,
    #[serde(default)]
    pub locations: Vec<PickListRow>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub wip_warehouse: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockEntryItem {
    pub item_code: ItemCode,
    pub qty: f64,
    pub uom: String,
    pub stock_uom: String,
    pub s_warehouse: Option<String>,
    pub t_warehouse: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub name: Option<String>,
    pub stock_entry_type: String,
    pub company: Option<String>,
    pub posting_date: NaiveDate,
    pub posting_time: NaiveTime,
    pub from_bom: bool,
    pub work_order: String,
    pub fg_completed_qty: f64,
    pub pick_list: String,
    pub remarks: String,
    pub items: Vec<StockEntryItem>,
}

/// Per-item data a stock transfer needs from the item master.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemStockDefaults {
    pub stock_uom: Option<String>,
    pub default_warehouse: Option<String>,
}

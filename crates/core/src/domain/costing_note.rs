use serde::{Deserialize, Serialize};

use super::boq::BoqId;
use super::item::ItemCode;
use super::opportunity::OpportunityId;
use super::{flt, opt_flt, RowId};
use crate::lifecycle::DocStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostingNoteId(pub String);

impl std::fmt::Display for CostingNoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostingNoteItem {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub item: Option<ItemCode>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub qty: f64,
    #[serde(default, deserialize_with = "flt")]
    pub cost: f64,
    /// Row-level margin percentage; blank or zero defers to the document margins.
    #[serde(default, deserialize_with = "opt_flt")]
    pub default_profit_margin: Option<f64>,
    #[serde(default, deserialize_with = "flt")]
    pub target_selling_price: f64,
    #[serde(default, deserialize_with = "flt")]
    pub total_cost: f64,
    #[serde(default, deserialize_with = "flt")]
    pub total_selling: f64,
    #[serde(default)]
    pub boq_link: Option<BoqId>,
}

impl CostingNoteItem {
    pub fn new(item: Option<ItemCode>, qty: f64) -> Self {
        Self {
            id: RowId::generate(),
            item,
            item_name: None,
            uom: None,
            qty,
            cost: 0.0,
            default_profit_margin: None,
            target_selling_price: 0.0,
            total_cost: 0.0,
            total_selling: 0.0,
            boq_link: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostingNoteTotals {
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub total_target_selling_price: f64,
    #[serde(default)]
    pub total_profit: f64,
    /// `total_profit / total_cost`, zero when there is no cost.
    #[serde(default)]
    pub profit_margin: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostingNote {
    #[serde(default)]
    pub name: Option<CostingNoteId>,
    #[serde(default)]
    pub status: DocStatus,
    #[serde(default)]
    pub opportunity: Option<OpportunityId>,
    #[serde(default)]
    pub party_type: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub default_profit_margin: Option<f64>,
    /// Older header margin kept as the last fallback of the margin precedence.
    #[serde(default, deserialize_with = "opt_flt")]
    pub legacy_profit_margin: Option<f64>,
    #[serde(default)]
    pub items: Vec<CostingNoteItem>,
    #[serde(default)]
    pub totals: CostingNoteTotals,
}

impl CostingNote {
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|name| name.0.as_str()).unwrap_or("new Costing Note")
    }

    pub fn row(&self, id: &RowId) -> Option<&CostingNoteItem> {
        self.items.iter().find(|row| &row.id == id)
    }

    pub fn row_mut(&mut self, id: &RowId) -> Option<&mut CostingNoteItem> {
        self.items.iter_mut().find(|row| &row.id == id)
    }
}

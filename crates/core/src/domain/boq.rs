use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::costing_note::CostingNoteId;
use super::item::ItemCode;
use super::{flt, RowId};
use crate::lifecycle::DocStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoqId(pub String);

impl std::fmt::Display for BoqId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four child tables of a BOQ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoqCategory {
    Material,
    Labor,
    Expense,
    Contractor,
}

impl BoqCategory {
    pub const ALL: [BoqCategory; 4] =
        [BoqCategory::Material, BoqCategory::Labor, BoqCategory::Expense, BoqCategory::Contractor];

    /// Material and labor rows carry a margin on top of their direct cost.
    pub fn applies_margin(self) -> bool {
        matches!(self, Self::Material | Self::Labor)
    }
}

/// Row whose charged cost is derived from a direct cost plus a margin percentage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginRow {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub item: Option<ItemCode>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub qty: f64,
    #[serde(default, deserialize_with = "flt")]
    pub direct_cost: f64,
    #[serde(default, deserialize_with = "flt")]
    pub margin: f64,
    #[serde(default, deserialize_with = "flt")]
    pub cost: f64,
    #[serde(default, deserialize_with = "flt")]
    pub total_cost: f64,
}

/// Row charged at its unit cost with no margin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub item: Option<ItemCode>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub qty: f64,
    #[serde(default, deserialize_with = "flt")]
    pub cost: f64,
    #[serde(default, deserialize_with = "flt")]
    pub total_cost: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoqTotals {
    #[serde(default)]
    pub total_material_costs: f64,
    #[serde(default)]
    pub total_labor_costs: f64,
    #[serde(default)]
    pub total_expenses: f64,
    #[serde(default)]
    pub total_contractors: f64,
    #[serde(default)]
    pub total_cost: f64,
}

/// Header margins as last persisted, used to detect header edits between saves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderMargins {
    pub base_margin: f64,
    pub s_margin: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boq {
    #[serde(default)]
    pub name: Option<BoqId>,
    #[serde(default)]
    pub status: DocStatus,
    #[serde(default)]
    pub costing_note: Option<CostingNoteId>,
    #[serde(default)]
    pub line_id: Option<RowId>,
    #[serde(default)]
    pub item: Option<ItemCode>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub project_qty: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Margin pushed onto material rows when edited.
    #[serde(default, deserialize_with = "flt")]
    pub base_margin: f64,
    /// Margin pushed onto labor rows when edited.
    #[serde(default, deserialize_with = "flt")]
    pub s_margin: f64,
    #[serde(default)]
    pub material_costs: Vec<MarginRow>,
    #[serde(default)]
    pub labor_costs: Vec<MarginRow>,
    #[serde(default)]
    pub expenses: Vec<FlatRow>,
    #[serde(default)]
    pub contractors: Vec<FlatRow>,
    #[serde(default)]
    pub totals: BoqTotals,
}

impl Boq {
    pub fn header_margins(&self) -> HeaderMargins {
        HeaderMargins { base_margin: self.base_margin, s_margin: self.s_margin }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|name| name.0.as_str()).unwrap_or("new BOQ")
    }

    pub fn row_count(&self) -> usize {
        self.material_costs.len()
            + self.labor_costs.len()
            + self.expenses.len()
            + self.contractors.len()
    }
}

impl Default for Boq {
    fn default() -> Self {
        Self {
            name: None,
            status: DocStatus::Draft,
            costing_note: None,
            line_id: None,
            item: None,
            unit: None,
            project_qty: 0.0,
            start_date: None,
            base_margin: 0.0,
            s_margin: 0.0,
            material_costs: Vec::new(),
            labor_costs: Vec::new(),
            expenses: Vec::new(),
            contractors: Vec::new(),
            totals: BoqTotals::default(),
        }
    }
}

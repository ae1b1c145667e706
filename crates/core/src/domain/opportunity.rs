use serde::{Deserialize, Serialize};

use super::item::ItemCode;
use super::{flt, opt_flt, RowId};
use crate::lifecycle::DocStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

impl std::fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opportunity line; monetary fields stay blank until priced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpportunityItem {
    #[serde(default)]
    pub id: RowId,
    pub item_code: ItemCode,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub qty: f64,
    #[serde(default, deserialize_with = "opt_flt")]
    pub rate: Option<f64>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub base_rate: Option<f64>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "opt_flt")]
    pub base_amount: Option<f64>,
}

/// Row of the "standard products" table that is merged into quotations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardProductRow {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub item: Option<ItemCode>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default, deserialize_with = "flt")]
    pub qty: f64,
    #[serde(default, deserialize_with = "flt")]
    pub rate: f64,
    #[serde(default, deserialize_with = "opt_flt")]
    pub amount: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(default)]
    pub name: Option<OpportunityId>,
    #[serde(default)]
    pub status: DocStatus,
    /// Party doctype, e.g. `Customer` or `Lead`.
    #[serde(default)]
    pub opportunity_from: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub items: Vec<OpportunityItem>,
    #[serde(default)]
    pub standard_items: Vec<StandardProductRow>,
}

impl Opportunity {
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|name| name.0.as_str()).unwrap_or("new Opportunity")
    }

    /// Opportunity validate hook: blank prices become explicit zeros so the host accepts
    /// unpriced lines.
    pub fn fill_missing_amounts(&mut self) {
        for row in &mut self.items {
            for field in [&mut row.rate, &mut row.amount, &mut row.base_rate, &mut row.base_amount]
            {
                if field.is_none() {
                    *field = Some(0.0);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub item_code: Option<ItemCode>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub uom: Option<String>,
    pub conversion_factor: f64,
    pub qty: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Quotation mapped from an opportunity; returned to the caller unsaved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub opportunity: Option<OpportunityId>,
    pub quotation_to: Option<String>,
    pub party_name: Option<String>,
    pub company: Option<String>,
    pub items: Vec<QuotationItem>,
    pub total_qty: f64,
    pub net_total: f64,
    pub grand_total: f64,
}

impl Quotation {
    pub fn calculate_totals(&mut self) {
        self.total_qty = self.items.iter().map(|row| row.qty).sum();
        self.net_total = self.items.iter().map(|row| row.amount).sum();
        self.grand_total = self.net_total;
    }
}

#[cfg(test)]
mod tests {
    use super::Opportunity;

    #[test]
    fn validate_hook_fills_blank_prices_with_zero() {
        let mut opportunity: Opportunity = serde_json::from_value(serde_json::json!({
            "items": [
                { "item_code": "ACS-0001", "qty": 2, "rate": null, "amount": "" },
                { "item_code": "SRV-001", "qty": 1, "rate": 15, "base_rate": 15 }
            ]
        }))
        .expect("opportunity");

        opportunity.fill_missing_amounts();

        let first = &opportunity.items[0];
        assert_eq!(
            (first.rate, first.amount, first.base_rate, first.base_amount),
            (Some(0.0), Some(0.0), Some(0.0), Some(0.0))
        );
        assert_eq!(opportunity.items[1].rate, Some(15.0));
    }
}

//! Cost roll-ups for BOQs and selling prices for Costing Notes.
//!
//! Arithmetic is plain `f64`; blank inputs have already been read as zero by the
//! document decoders.

pub mod pricing;
pub mod rollup;

use serde::{Deserialize, Serialize};

pub use pricing::validate_costing_note;
pub use rollup::{recalc_totals, validate_boq, MarginSync};

/// Where "update BOQ costs" reads unit costs from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    #[default]
    PriceList,
    Valuation,
    LastPurchase,
}

impl CostSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceList => "price_list",
            Self::Valuation => "valuation",
            Self::LastPurchase => "last_purchase",
        }
    }

    /// Unknown or blank sources fall back to the price list.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("valuation") => Self::Valuation,
            Some("last_purchase") => Self::LastPurchase,
            _ => Self::PriceList,
        }
    }
}

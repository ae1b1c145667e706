pub mod boq;
pub mod costing_note;
pub mod item;
pub mod opportunity;
pub mod stock;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Stable identity of a child row inside its parent document snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl RowId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

/// Reads a numeric field the way the ERP form layer submits it: numbers, numeric
/// strings, blank strings and `null` are all accepted, blank and `null` read as zero.
pub fn flt<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(match value {
        None => 0.0,
        Some(LooseNumber::Number(number)) => number,
        Some(LooseNumber::Text(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
    })
}

/// Like [`flt`] but keeps blank values distinguishable from an explicit zero.
pub fn opt_flt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(LooseNumber::Number(number)) => Some(number),
        Some(LooseNumber::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.parse::<f64>().unwrap_or(0.0))
            }
        }
    })
}

/// Treats a missing, blank or zero optional number as unset.
pub(crate) fn truthy(value: Option<f64>) -> Option<f64> {
    value.filter(|number| *number != 0.0 && !number.is_nan())
}

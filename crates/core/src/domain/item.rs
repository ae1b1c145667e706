use serde::{Deserialize, Deserializer, Serialize};

use super::flt;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemCode(pub String);

impl std::fmt::Display for ItemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item classification that selects a naming template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    StandardProduct,
    Asset,
    Accessories,
    Services,
    MaterialItem,
    CustomizedProduct,
    Part,
    Wip,
}

impl ItemType {
    pub const ALL: [ItemType; 8] = [
        ItemType::StandardProduct,
        ItemType::Asset,
        ItemType::Accessories,
        ItemType::Services,
        ItemType::MaterialItem,
        ItemType::CustomizedProduct,
        ItemType::Part,
        ItemType::Wip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::StandardProduct => "Standard Product",
            Self::Asset => "Asset Item",
            Self::Accessories => "Accessories",
            Self::Services => "Services",
            Self::MaterialItem => "Material Item",
            Self::CustomizedProduct => "Customized Product",
            Self::Part => "Part",
            Self::Wip => "WIP",
        }
    }

    /// Flags forced onto items of this type; `None` leaves user-set flags alone.
    pub fn forced_flags(self) -> Option<ItemFlags> {
        match self {
            Self::StandardProduct | Self::CustomizedProduct => Some(ItemFlags {
                is_purchase_item: false,
                is_sales_item: true,
                is_stock_item: true,
                is_fixed_asset: false,
            }),
            Self::MaterialItem | Self::Accessories => Some(ItemFlags {
                is_purchase_item: true,
                is_sales_item: false,
                is_stock_item: true,
                is_fixed_asset: false,
            }),
            Self::Asset => Some(ItemFlags {
                is_purchase_item: true,
                is_sales_item: false,
                is_stock_item: false,
                is_fixed_asset: true,
            }),
            Self::Services => Some(ItemFlags {
                is_purchase_item: true,
                is_sales_item: true,
                is_stock_item: false,
                is_fixed_asset: false,
            }),
            Self::Part | Self::Wip => None,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ItemType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "standard product" => Ok(Self::StandardProduct),
            "asset item" | "asset" => Ok(Self::Asset),
            "accessories" => Ok(Self::Accessories),
            "services" | "service item" => Ok(Self::Services),
            "material item" => Ok(Self::MaterialItem),
            "customized product" => Ok(Self::CustomizedProduct),
            "part" => Ok(Self::Part),
            "wip" => Ok(Self::Wip),
            _ => Err(DomainError::UnknownItemType(value.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFlags {
    #[serde(default)]
    pub is_purchase_item: bool,
    #[serde(default)]
    pub is_sales_item: bool,
    #[serde(default)]
    pub is_stock_item: bool,
    #[serde(default)]
    pub is_fixed_asset: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementType {
    Area,
    Perimeter,
    Depth,
    #[serde(rename = "Width Only")]
    WidthOnly,
    #[serde(rename = "Height Only")]
    HeightOnly,
}

impl MeasurementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Area => "Area",
            Self::Perimeter => "Perimeter",
            Self::Depth => "Depth",
            Self::WidthOnly => "Width Only",
            Self::HeightOnly => "Height Only",
        }
    }

    /// Select value as the form submits it; blank or unknown values read as unset.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Area" => Some(Self::Area),
            "Perimeter" => Some(Self::Perimeter),
            "Depth" => Some(Self::Depth),
            "Width Only" => Some(Self::WidthOnly),
            "Height Only" => Some(Self::HeightOnly),
            _ => None,
        }
    }
}

fn lenient_measurement_type<'de, D>(deserializer: D) -> Result<Option<MeasurementType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(MeasurementType::parse))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UomConversion {
    pub uom: String,
    #[serde(default, deserialize_with = "flt")]
    pub conversion_factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub code: Option<ItemCode>,
    #[serde(default)]
    pub item_name: Option<String>,
    /// Raw classification text as entered; parsed when a naming rule is needed.
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub item_group: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub main_product: Option<String>,
    #[serde(default)]
    pub part_type: Option<String>,
    #[serde(default = "default_stock_uom")]
    pub stock_uom: String,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default, deserialize_with = "flt")]
    pub valuation_rate: f64,
    #[serde(default, deserialize_with = "flt")]
    pub width: f64,
    #[serde(default, deserialize_with = "flt")]
    pub height: f64,
    #[serde(default, deserialize_with = "flt")]
    pub depth: f64,
    #[serde(default, deserialize_with = "lenient_measurement_type")]
    pub measurement_type: Option<MeasurementType>,
    #[serde(default)]
    pub uoms: Vec<UomConversion>,
    #[serde(default)]
    pub measurement_total: f64,
    #[serde(default)]
    pub measurement_total_stock_uom: f64,
}

pub fn default_stock_uom() -> String {
    "Nos".to_string()
}

impl Item {
    /// Item validate hook: type-driven flags and measurement totals.
    pub fn validate(&mut self) {
        self.enforce_flags_by_type();
        self.compute_measurement_totals();
    }

    pub fn parsed_type(&self) -> Option<Result<ItemType, DomainError>> {
        self.item_type
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(str::parse::<ItemType>)
    }

    pub fn enforce_flags_by_type(&mut self) {
        if let Some(Ok(item_type)) = self.parsed_type() {
            if let Some(flags) = item_type.forced_flags() {
                self.flags = flags;
            }
        }
    }

    pub fn compute_measurement_totals(&mut self) {
        let (w, h, d) = (self.width, self.height, self.depth);
        let total = match self.measurement_type {
            Some(MeasurementType::Area) => w * h,
            Some(MeasurementType::Perimeter) => 2.0 * (w + h),
            Some(MeasurementType::Depth) => w * h * d,
            Some(MeasurementType::WidthOnly) => w,
            Some(MeasurementType::HeightOnly) => h,
            None => 0.0,
        };

        let conversion_factor = self
            .uoms
            .iter()
            .find(|row| row.uom == self.stock_uom)
            .map(|row| if row.conversion_factor == 0.0 { 1.0 } else { row.conversion_factor })
            .unwrap_or(1.0);

        self.measurement_total = total;
        self.measurement_total_stock_uom = total / conversion_factor;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTypeRecord {
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroupDefault {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub default_warehouse: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    pub lft: i64,
    pub rgt: i64,
}

/// Nested-set bounds of an item group; descendants satisfy `lft < x.lft && x.rgt < rgt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBounds {
    pub lft: i64,
    pub rgt: i64,
}

impl GroupBounds {
    pub fn contains(&self, other: &GroupBounds) -> bool {
        self.lft <= other.lft && other.rgt <= self.rgt
    }
}

//! Item code derivation.
//!
//! Each item type maps to exactly one template. Series templates hand their pattern to
//! the autonaming allocator; composite templates (parts and work in progress) build a
//! candidate from related records and only need a free-suffix search.

pub mod series;

use serde::{Deserialize, Serialize};

use crate::domain::item::{Item, ItemType};
use crate::errors::DomainError;

pub use series::{unique_code, SeriesPattern};

/// Contextual attributes an item code may be derived from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingRequest {
    pub item_type: String,
    #[serde(default)]
    pub item_group: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub main_product: Option<String>,
    #[serde(default)]
    pub part_type: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
}

impl NamingRequest {
    pub fn from_item(item: &Item) -> Option<Self> {
        let item_type = item.item_type.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(Self {
            item_type: item_type.to_string(),
            item_group: item.item_group.clone(),
            brand: item.brand.clone(),
            main_product: item.main_product.clone(),
            part_type: item.part_type.clone(),
            item_name: item.item_name.clone(),
        })
    }
}

/// Values looked up from master records for a [`NamingRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamingAttributes {
    /// Abbreviation on the selected brand.
    pub brand_abbr: Option<String>,
    /// Abbreviation on the selected item group.
    pub group_abbr: Option<String>,
    /// Abbreviation on the item type record.
    pub type_abbr: Option<String>,
    /// Code of the referenced main product; the raw reference when no such item exists.
    pub main_product_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodePlan {
    /// Allocate the next number of an autoname pattern.
    Series { pattern: String },
    /// Use `base`, or the first free `base-NNN`.
    Composite { base: String },
}

pub fn normalize_abbr(value: Option<&str>) -> Option<String> {
    value.map(|raw| raw.trim().to_uppercase()).filter(|abbr| !abbr.is_empty())
}

/// Upper-cases, turns spaces into dashes and drops anything outside `[A-Z0-9-]`.
pub fn slug(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .to_uppercase()
        .trim()
        .replace(' ', "-")
        .chars()
        .filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || *ch == '-')
        .collect()
}

pub fn plan_item_code(
    request: &NamingRequest,
    attributes: &NamingAttributes,
) -> Result<CodePlan, DomainError> {
    let item_type: ItemType = request.item_type.parse()?;

    let brand = || {
        normalize_abbr(attributes.brand_abbr.as_deref())
            .ok_or_else(|| DomainError::missing("the abbreviation on the selected Brand"))
    };
    let group = || {
        normalize_abbr(attributes.group_abbr.as_deref())
            .ok_or_else(|| DomainError::missing("the abbreviation on the selected Item Group"))
    };
    let main_product = || {
        let code = slug(attributes.main_product_code.as_deref());
        if code.is_empty() {
            Err(DomainError::missing("the Main Product"))
        } else {
            Ok(code)
        }
    };

    let plan = match item_type {
        ItemType::StandardProduct => {
            let b = brand()?;
            let g = group()?;
            CodePlan::Series { pattern: format!("{b}-{g}-.###") }
        }
        ItemType::Asset => CodePlan::Series { pattern: format!("AS-{}-.###", group()?) },
        ItemType::Accessories => CodePlan::Series { pattern: "ACS-.####".to_string() },
        ItemType::Services => CodePlan::Series { pattern: "SRV-.###".to_string() },
        ItemType::MaterialItem => CodePlan::Series { pattern: format!("MTR-{}-.###", group()?) },
        ItemType::CustomizedProduct => {
            let t = normalize_abbr(attributes.type_abbr.as_deref())
                .ok_or_else(|| DomainError::missing("the abbreviation on the selected Item Type"))?;
            let g = group()?;
            CodePlan::Series { pattern: format!("{t}-{g}-.###") }
        }
        ItemType::Part => {
            let mp = main_product()?;
            let pt = slug(request.part_type.as_deref());
            if pt.is_empty() {
                return Err(DomainError::missing("the Part Type"));
            }
            CodePlan::Composite { base: format!("PRT-{mp}-{pt}") }
        }
        ItemType::Wip => {
            let mp = main_product()?;
            let name = slug(request.item_name.as_deref());
            if name.is_empty() {
                return Err(DomainError::missing("the Item Name"));
            }
            CodePlan::Composite { base: format!("WIP-{mp}-{name}") }
        }
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::{plan_item_code, slug, CodePlan, NamingAttributes, NamingRequest};
    use crate::errors::DomainError;

    fn request(item_type: &str) -> NamingRequest {
        NamingRequest { item_type: item_type.to_string(), ..NamingRequest::default() }
    }

    fn attributes() -> NamingAttributes {
        NamingAttributes {
            brand_abbr: Some(" acme ".to_string()),
            group_abbr: Some("pnl".to_string()),
            type_abbr: Some("cp".to_string()),
            main_product_code: Some("acme pnl 001".to_string()),
        }
    }

    fn series(plan: CodePlan) -> String {
        match plan {
            CodePlan::Series { pattern } => pattern,
            other => panic!("expected series plan, got {other:?}"),
        }
    }

    #[test]
    fn every_series_type_maps_to_its_template() {
        let cases = [
            ("Standard Product", "ACME-PNL-.###"),
            ("asset item", "AS-PNL-.###"),
            ("ASSET", "AS-PNL-.###"),
            ("Accessories", "ACS-.####"),
            ("Services", "SRV-.###"),
            ("Material Item", "MTR-PNL-.###"),
            ("Customized Product", "CP-PNL-.###"),
        ];

        for (item_type, expected) in cases {
            let plan = plan_item_code(&request(item_type), &attributes()).expect(item_type);
            assert_eq!(series(plan), expected, "{item_type}");
        }
    }

    #[test]
    fn part_and_wip_build_composite_codes() {
        let mut part = request("Part");
        part.part_type = Some("side lid".to_string());
        assert_eq!(
            plan_item_code(&part, &attributes()).expect("part"),
            CodePlan::Composite { base: "PRT-ACME-PNL-001-SIDE-LID".to_string() }
        );

        let mut wip = request("wip");
        wip.item_name = Some("Frame, welded".to_string());
        assert_eq!(
            plan_item_code(&wip, &attributes()).expect("wip"),
            CodePlan::Composite { base: "WIP-ACME-PNL-001-FRAME-WELDED".to_string() }
        );
    }

    #[test]
    fn unmapped_type_is_fatal() {
        let error = plan_item_code(&request("Gadget"), &attributes()).expect_err("unknown");
        assert_eq!(error, DomainError::UnknownItemType("Gadget".to_string()));
    }

    #[test]
    fn missing_attributes_name_what_to_fix() {
        let bare = NamingAttributes::default();

        let error = plan_item_code(&request("Standard Product"), &bare).expect_err("brand");
        assert!(error.to_string().contains("selected Brand"));

        let error = plan_item_code(&request("Material Item"), &bare).expect_err("group");
        assert!(error.to_string().contains("selected Item Group"));

        let error = plan_item_code(&request("Customized Product"), &bare).expect_err("type");
        assert!(error.to_string().contains("selected Item Type"));

        let error = plan_item_code(&request("Part"), &bare).expect_err("main product");
        assert!(error.to_string().contains("Main Product"));

        let error = plan_item_code(&request("Part"), &attributes()).expect_err("part type");
        assert!(error.to_string().contains("Part Type"));

        let error = plan_item_code(&request("WIP"), &attributes()).expect_err("item name");
        assert!(error.to_string().contains("Item Name"));
    }

    #[test]
    fn blank_abbreviation_counts_as_missing() {
        let attributes =
            NamingAttributes { group_abbr: Some("   ".to_string()), ..NamingAttributes::default() };
        assert!(plan_item_code(&request("Asset"), &attributes).is_err());
    }

    #[test]
    fn slug_keeps_only_code_safe_characters() {
        assert_eq!(slug(Some("  Top cover/v2 ")), "TOP-COVERV2");
        assert_eq!(slug(Some("éclair")), "CLAIR");
        assert_eq!(slug(None), "");
    }
}

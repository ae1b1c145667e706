use std::collections::HashSet;

use tally_core::domain::item::{GroupBounds, Item, ItemCode};
use tally_core::errors::DomainError;
use tally_core::naming::{plan_item_code, unique_code, CodePlan, NamingAttributes, NamingRequest};
use tracing::info;

use super::{non_blank, persistence, DocumentServices, ServiceResult};

impl DocumentServices {
    /// Resolves the next item code for a naming request, consuming a series number
    /// when the item type uses one.
    pub async fn next_item_code(&self, request: &NamingRequest) -> ServiceResult<String> {
        let attributes = self.naming_attributes(request).await?;
        let code = match plan_item_code(request, &attributes)? {
            CodePlan::Series { pattern } => self.allocate_name(&pattern).await?,
            CodePlan::Composite { base } => {
                let taken: HashSet<String> = self
                    .items
                    .codes_with_prefix(&base)
                    .await
                    .map_err(persistence)?
                    .into_iter()
                    .collect();
                unique_code(
                    &base,
                    self.erp.code_suffix_width,
                    self.erp.max_code_attempts,
                    |candidate| taken.contains(candidate),
                )?
            }
        };

        info!(
            event_name = "items.code.resolved",
            item_type = %request.item_type,
            item_code = %code,
            "item code resolved"
        );
        Ok(code)
    }

    async fn naming_attributes(&self, request: &NamingRequest) -> ServiceResult<NamingAttributes> {
        let brand_abbr = match non_blank(request.brand.as_deref()) {
            Some(brand) => {
                self.masters.brand(brand).await.map_err(persistence)?.and_then(|b| b.abbreviation)
            }
            None => None,
        };
        let group_abbr = match non_blank(request.item_group.as_deref()) {
            Some(group) => self
                .masters
                .item_group(group)
                .await
                .map_err(persistence)?
                .and_then(|g| g.abbreviation),
            None => None,
        };
        let type_abbr = self
            .masters
            .item_type(request.item_type.trim())
            .await
            .map_err(persistence)?
            .and_then(|record| record.abbreviation);
        let main_product_code = match non_blank(request.main_product.as_deref()) {
            Some(reference) => {
                let found = self
                    .items
                    .find_by_code(&ItemCode(reference.to_string()))
                    .await
                    .map_err(persistence)?
                    .and_then(|item| item.code);
                Some(found.map(|code| code.0).unwrap_or_else(|| reference.to_string()))
            }
            None => None,
        };

        Ok(NamingAttributes { brand_abbr, group_abbr, type_abbr, main_product_code })
    }

    /// Item insert: keeps an explicit code or resolves one from the item type, then
    /// applies the validate hook.
    pub async fn insert_item(&self, mut item: Item) -> ServiceResult<Item> {
        let explicit = non_blank(item.code.as_ref().map(|code| code.0.as_str())).map(str::to_string);
        let code = match explicit {
            Some(code) => code,
            None => {
                let request = NamingRequest::from_item(&item)
                    .ok_or_else(|| DomainError::missing("the Item Code or Item Type"))?;
                self.next_item_code(&request).await?
            }
        };

        if self.items.code_exists(&code).await.map_err(persistence)? {
            return Err(DomainError::InvariantViolation(format!("Item {code} already exists")).into());
        }

        item.code = Some(ItemCode(code));
        item.validate();
        self.items.insert(&item).await.map_err(persistence)?;

        info!(
            event_name = "items.inserted",
            item_code = item.code.as_ref().map(|code| code.0.as_str()).unwrap_or_default(),
            "item inserted"
        );
        Ok(item)
    }

    pub async fn get_item(&self, code: &str) -> ServiceResult<Item> {
        self.items
            .find_by_code(&ItemCode(code.to_string()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Item", code).into())
    }

    pub async fn item_group_bounds(&self, name: &str) -> ServiceResult<GroupBounds> {
        let group = self
            .masters
            .item_group(name)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found("Item Group", name))?;
        Ok(GroupBounds { lft: group.lft, rgt: group.rgt })
    }

    /// Item -> item group -> group default row for the company.
    pub async fn default_warehouse(
        &self,
        item_code: &str,
        company: Option<&str>,
    ) -> ServiceResult<Option<String>> {
        let company = self.company_or_default(company);
        let item = self
            .items
            .find_by_code(&ItemCode(item_code.to_string()))
            .await
            .map_err(persistence)?;

        let Some(group) = item.and_then(|item| item.item_group).filter(|g| !g.trim().is_empty())
        else {
            return Ok(None);
        };
        Ok(self.masters.group_default_warehouse(&group, company.as_deref()).await)
    }
}
